//! A1-style address helpers: column letters, `$` anchors and sheet prefixes.

use regex::Regex;
use std::sync::OnceLock;

fn a1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").expect("static A1 pattern is valid")
    })
}

/// Convert a 0-based column index to letters (0→A, 25→Z, 26→AA).
pub fn column_to_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;

    loop {
        let remainder = n % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }

    result
}

/// Convert column letters to a 0-based index (A→0, AA→26). Case-insensitive.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// Parse a local A1 address (`B3`, `$B$3`, `b$3`) into 0-based `(row, col)`.
pub fn parse_a1(text: &str) -> Option<(u32, u32)> {
    let caps = a1_pattern().captures(text)?;
    let col = letters_to_column(caps.get(1)?.as_str())?;
    let row: u32 = caps.get(2)?.as_str().parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}

/// Split `Sheet!A1` / `'My Sheet'!A1` into `(sheet, local)`. `None` without a `!`.
pub fn split_sheet(text: &str) -> Option<(String, &str)> {
    if let Some(rest) = text.strip_prefix('\'') {
        // Quoted sheet: '' is an escaped quote.
        let mut sheet = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if let Some((_, '\'')) = chars.peek() {
                    sheet.push('\'');
                    chars.next();
                    continue;
                }
                let after = &rest[i + 1..];
                return after.strip_prefix('!').map(|local| (sheet, local));
            }
            sheet.push(c);
        }
        return None;
    }
    let (sheet, local) = text.rsplit_once('!')?;
    if sheet.is_empty() {
        return None;
    }
    Some((sheet.to_string(), local))
}

/// Quote a sheet name for display when it is not a plain identifier.
pub fn quote_sheet(sheet: &str) -> String {
    let plain = !sheet.is_empty()
        && sheet.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !sheet.chars().next().is_some_and(|c| c.is_ascii_digit());
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_to_letters() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(25), "Z");
        assert_eq!(column_to_letters(26), "AA");
        assert_eq!(column_to_letters(51), "AZ");
        assert_eq!(column_to_letters(701), "ZZ");
        assert_eq!(column_to_letters(702), "AAA");
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(letters_to_column("A"), Some(0));
        assert_eq!(letters_to_column("z"), Some(25));
        assert_eq!(letters_to_column("AA"), Some(26));
        assert_eq!(letters_to_column("AAA"), Some(702));
        assert_eq!(letters_to_column(""), None);
        assert_eq!(letters_to_column("A1"), None);
    }

    #[test]
    fn test_parse_a1_with_anchors() {
        assert_eq!(parse_a1("A1"), Some((0, 0)));
        assert_eq!(parse_a1("$C$10"), Some((9, 2)));
        assert_eq!(parse_a1("b$2"), Some((1, 1)));
        assert_eq!(parse_a1("A0"), None);
        assert_eq!(parse_a1("SUM"), None);
        assert_eq!(parse_a1("ABCD1"), None);
    }

    #[test]
    fn test_split_sheet() {
        assert_eq!(
            split_sheet("Sheet2!B3"),
            Some(("Sheet2".to_string(), "B3"))
        );
        assert_eq!(
            split_sheet("'Q1 Plan'!A1"),
            Some(("Q1 Plan".to_string(), "A1"))
        );
        assert_eq!(
            split_sheet("'It''s'!A1"),
            Some(("It's".to_string(), "A1"))
        );
        assert_eq!(split_sheet("A1"), None);
    }

    #[test]
    fn test_quote_sheet() {
        assert_eq!(quote_sheet("Sheet1"), "Sheet1");
        assert_eq!(quote_sheet("Q1 Plan"), "'Q1 Plan'");
        assert_eq!(quote_sheet("It's"), "'It''s'");
        assert_eq!(quote_sheet("2024"), "'2024'");
    }
}
