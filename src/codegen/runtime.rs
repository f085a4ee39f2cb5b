//! Support library emitted next to every generated class.
//!
//! Generated statements call into `XlRuntime` for the spreadsheet semantics
//! C# lacks natively: loose conversions, spreadsheet ordering, checked
//! division, and the built-in functions. Spreadsheet errors surface as
//! `DivideByZeroException` (`#DIV/0!`) or `XlErrorException` (everything else).

/// Namespaces the generated file imports.
pub const USINGS: &[&str] = &[
    "System",
    "System.Collections.Generic",
    "System.Globalization",
    "System.Linq",
];

/// `XlRuntime` helpers that can raise a spreadsheet error.
pub const RAISING_HELPERS: &[&str] = &[
    "ToNumber", "ToBool", "Divide", "Power", "Mod", "Sqrt", "Average", "And", "Or", "Choose",
    "Index", "Match", "VLookup",
];

pub const RUNTIME_SOURCE: &str = r##"/// <summary>A spreadsheet error value such as #VALUE! or #N/A.</summary>
public sealed class XlErrorException : Exception
{
    public XlErrorException(string code) : base(code)
    {
        Code = code;
    }

    public string Code { get; }
}

/// <summary>
/// A computed cell whose spreadsheet error is held until the cell is read,
/// so an IFERROR downstream can still catch it.
/// </summary>
public sealed class XlValue<T>
{
    private readonly T value;
    private readonly Exception error;

    public XlValue(Func<T> compute)
    {
        try
        {
            value = compute();
        }
        catch (Exception e) when (e is XlErrorException || e is DivideByZeroException)
        {
            error = e;
        }
    }

    public T Value => error is null ? value : throw error;
}

internal static class XlRuntime
{
    public static double ToNumber(double value) => value;

    public static double ToNumber(long value) => value;

    public static double ToNumber(bool value) => value ? 1.0 : 0.0;

    public static double ToNumber(string value)
    {
        if (double.TryParse(value.Trim(), NumberStyles.Float, CultureInfo.InvariantCulture, out var number)
            && double.IsFinite(number))
        {
            return number;
        }
        throw new XlErrorException("#VALUE!");
    }

    public static double ToNumber(object value) => value switch
    {
        null => 0.0,
        double d => d,
        long l => l,
        int i => i,
        bool b => ToNumber(b),
        string s => ToNumber(s),
        _ => throw new XlErrorException("#VALUE!"),
    };

    public static string ToText(double value)
    {
        if (Math.Floor(value) == value && Math.Abs(value) < 1e15)
        {
            return ((long)value).ToString(CultureInfo.InvariantCulture);
        }
        return double.Parse(value.ToString("E14", CultureInfo.InvariantCulture), CultureInfo.InvariantCulture)
            .ToString("R", CultureInfo.InvariantCulture);
    }

    public static string ToText(long value) => value.ToString(CultureInfo.InvariantCulture);

    public static string ToText(bool value) => value ? "TRUE" : "FALSE";

    public static string ToText(string value) => value;

    public static string ToText(object value) => value switch
    {
        null => "",
        double d => ToText(d),
        long l => ToText(l),
        int i => ToText((long)i),
        bool b => ToText(b),
        string s => s,
        _ => throw new XlErrorException("#VALUE!"),
    };

    public static bool ToBool(double value) => value != 0.0;

    public static bool ToBool(long value) => value != 0;

    public static bool ToBool(bool value) => value;

    public static bool ToBool(string value)
    {
        if (string.Equals(value, "TRUE", StringComparison.OrdinalIgnoreCase)) return true;
        if (string.Equals(value, "FALSE", StringComparison.OrdinalIgnoreCase)) return false;
        throw new XlErrorException("#VALUE!");
    }

    public static bool ToBool(object value) => value switch
    {
        null => false,
        bool b => b,
        string s => ToBool(s),
        _ => ToNumber(value) != 0.0,
    };

    /// <summary>Spreadsheet ordering: numbers &lt; text &lt; booleans; text ignores case.</summary>
    public static int Compare(object left, object right)
    {
        left = Normalize(left) ?? Blank(Normalize(right));
        right = Normalize(right) ?? Blank(left);
        int rank(object v) => v is double ? 0 : v is string ? 1 : 2;
        var byRank = rank(left).CompareTo(rank(right));
        if (byRank != 0) return byRank;
        return left switch
        {
            double d => Math.Sign(d.CompareTo((double)right)),
            string s => Math.Sign(string.Compare(s, (string)right, StringComparison.OrdinalIgnoreCase)),
            _ => ((bool)left).CompareTo((bool)right),
        };
    }

    private static object Normalize(object value) => value switch
    {
        long l => (double)l,
        int i => (double)i,
        _ => value,
    };

    private static object Blank(object other) => other switch
    {
        string _ => "",
        bool _ => false,
        _ => 0.0,
    };

    public static double Divide(double numerator, double denominator)
    {
        if (denominator == 0.0) throw new DivideByZeroException("#DIV/0!");
        return numerator / denominator;
    }

    public static double Power(double value, double exponent) => Finite(Math.Pow(value, exponent));

    public static double Mod(double value, double divisor)
    {
        if (divisor == 0.0) throw new DivideByZeroException("#DIV/0!");
        return value - divisor * Math.Floor(value / divisor);
    }

    public static double Sqrt(double value)
    {
        if (value < 0.0) throw new XlErrorException("#NUM!");
        return Math.Sqrt(value);
    }

    public static double Round(double value, double digits)
    {
        var scale = Math.Pow(10, Math.Truncate(digits));
        return Math.Round(value * scale, MidpointRounding.AwayFromZero) / scale;
    }

    public static double RoundUp(double value, double digits)
    {
        var scale = Math.Pow(10, Math.Truncate(digits));
        return Math.Sign(value) * Math.Ceiling(Math.Abs(value) * scale) / scale;
    }

    public static double RoundDown(double value, double digits)
    {
        var scale = Math.Pow(10, Math.Truncate(digits));
        return Math.Sign(value) * Math.Floor(Math.Abs(value) * scale) / scale;
    }

    public static double Sum(params double[] values) => values.Sum();

    public static double Average(params double[] values)
    {
        if (values.Length == 0) throw new DivideByZeroException("#DIV/0!");
        return values.Average();
    }

    public static double Min(params double[] values) => values.Length == 0 ? 0.0 : values.Min();

    public static double Max(params double[] values) => values.Length == 0 ? 0.0 : values.Max();

    public static double Product(params double[] values) =>
        values.Length == 0 ? 0.0 : values.Aggregate(1.0, (acc, v) => acc * v);

    public static double Npv(double rate, params double[] values)
    {
        var total = 0.0;
        for (var i = 0; i < values.Length; i++)
        {
            total += values[i] / Math.Pow(1.0 + rate, i + 1);
        }
        return total;
    }

    public static long CountNumeric(string value) =>
        double.TryParse(value.Trim(), NumberStyles.Float, CultureInfo.InvariantCulture, out _) ? 1 : 0;

    public static bool And(params bool[] values)
    {
        if (values.Length == 0) throw new XlErrorException("#VALUE!");
        return values.All(v => v);
    }

    public static bool Or(params bool[] values)
    {
        if (values.Length == 0) throw new XlErrorException("#VALUE!");
        return values.Any(v => v);
    }

    public static T IfError<T>(Func<T> value, Func<T> fallback)
    {
        try
        {
            return value();
        }
        catch (Exception e) when (e is XlErrorException || e is DivideByZeroException)
        {
            return fallback();
        }
    }

    public static T Choose<T>(double index, params Func<T>[] options)
    {
        var i = (long)Math.Truncate(index);
        if (i < 1 || i > options.Length) throw new XlErrorException("#VALUE!");
        return options[i - 1]();
    }

    public static long Len(string value) => value.Length;

    public static string Upper(string value) => value.ToUpperInvariant();

    public static string Lower(string value) => value.ToLowerInvariant();

    public static string Trim(string value) =>
        string.Join(" ", value.Split(' ', StringSplitOptions.RemoveEmptyEntries));

    public static T Index<T>(T[] values, long width, double row, double column)
    {
        var height = values.Length / width;
        var r = (long)Math.Truncate(row);
        var c = (long)Math.Truncate(column);
        if (c == 0)
        {
            if (width == 1) c = 1;
            else if (height == 1) { c = r; r = 1; }
            else throw new XlErrorException("#REF!");
        }
        if (r < 1 || c < 1 || r > height || c > width) throw new XlErrorException("#REF!");
        return values[(r - 1) * width + c - 1];
    }

    /// <summary>1-based position; type 0 exact, 1 largest &lt;= key, -1 smallest &gt;= key.</summary>
    public static long Match(object key, object[] values, double matchType)
    {
        if (matchType == 0.0)
        {
            for (var i = 0; i < values.Length; i++)
            {
                if (Compare(values[i], key) == 0) return i + 1;
            }
            throw new XlErrorException("#N/A");
        }
        long found = 0;
        for (var i = 0; i < values.Length; i++)
        {
            var ordering = Compare(values[i], key);
            if (matchType > 0.0 ? ordering > 0 : ordering < 0) break;
            found = i + 1;
        }
        if (found == 0) throw new XlErrorException("#N/A");
        return found;
    }

    public static object VLookup(object key, object[] table, long width, double column, bool approximate)
    {
        var col = (long)Math.Truncate(column);
        if (col < 1 || col > width) throw new XlErrorException("#REF!");
        var firstColumn = new object[table.Length / width];
        for (var r = 0; r < firstColumn.Length; r++)
        {
            firstColumn[r] = table[r * width];
        }
        var row = Match(key, firstColumn, approximate ? 1.0 : 0.0);
        return table[(row - 1) * width + col - 1];
    }

    private static double Finite(double value)
    {
        if (double.IsNaN(value) || double.IsInfinity(value)) throw new XlErrorException("#NUM!");
        return value;
    }
}
"##;
