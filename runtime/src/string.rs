//! String helpers for qbvm builtins.
//!
//! BASIC string positions are 1-based and lengths are clamped rather than
//! rejected, so most helpers here never fail: asking for more characters
//! than exist just returns what is there.
//!
//! Number formatting for PRINT and STR$ also lives here, together with the
//! `PRINT USING` template engine.

/// Longest string SPACE$ and STRING$ will build.
pub const MAX_LEN: i64 = 32767;

// ============================================================================
// Substrings
// ============================================================================

/// LEFT$: the leftmost `n` characters.
pub fn left(s: &str, n: i64) -> String {
    if n <= 0 {
        return String::new();
    }
    s.chars().take(n as usize).collect()
}

/// RIGHT$: the rightmost `n` characters.
pub fn right(s: &str, n: i64) -> String {
    if n <= 0 {
        return String::new();
    }
    let len = s.chars().count();
    let take = (n as usize).min(len);
    s.chars().skip(len - take).collect()
}

/// MID$: `length` characters from 1-based `start` (rest of string if `None`).
pub fn mid(s: &str, start: i64, length: Option<i64>) -> String {
    if start < 1 {
        return String::new();
    }
    let chars = s.chars().skip((start - 1) as usize);
    match length {
        Some(n) if n <= 0 => String::new(),
        Some(n) => chars.take(n as usize).collect(),
        None => chars.collect(),
    }
}

/// INSTR: 1-based position of `needle` in `haystack` at or after `start`,
/// or 0 when absent.
pub fn instr(start: i64, haystack: &str, needle: &str) -> i64 {
    let start = start.max(1) as usize;
    let hay: Vec<char> = haystack.chars().collect();
    let pat: Vec<char> = needle.chars().collect();

    if start > hay.len() {
        return if pat.is_empty() && start == hay.len() + 1 && hay.is_empty() {
            1
        } else {
            0
        };
    }
    if pat.is_empty() {
        return start as i64;
    }
    if pat.len() > hay.len() {
        return 0;
    }

    (start - 1..=hay.len() - pat.len())
        .find(|&i| hay[i..i + pat.len()] == pat[..])
        .map(|i| i as i64 + 1)
        .unwrap_or(0)
}

/// LTRIM$: strips leading spaces.
pub fn ltrim(s: &str) -> String {
    s.trim_start_matches(' ').to_string()
}

/// RTRIM$: strips trailing spaces.
pub fn rtrim(s: &str) -> String {
    s.trim_end_matches(' ').to_string()
}

/// SPACE$: `n` spaces.
pub fn space(n: i64) -> String {
    " ".repeat(n.clamp(0, MAX_LEN) as usize)
}

/// STRING$: `n` copies of `ch`.
pub fn string_fill(n: i64, ch: char) -> String {
    std::iter::repeat_n(ch, n.clamp(0, MAX_LEN) as usize).collect()
}

/// CHR$: the character for a code point in 0..=255.
pub fn chr(code: i64) -> Option<String> {
    if (0..=255).contains(&code) {
        Some(char::from(code as u8).to_string())
    } else {
        None
    }
}

/// ASC: code of the first character, `None` for an empty string.
pub fn asc(s: &str) -> Option<i64> {
    s.chars().next().map(|c| c as i64)
}

// ============================================================================
// Numeric Conversion
// ============================================================================

/// VAL: the numeric prefix of a string; 0 when there is none.
///
/// Blanks anywhere in the text are ignored and `&H`/`&O`/`&B` prefixes are
/// understood, matching QBasic.
pub fn val(s: &str) -> f64 {
    let text: String = s.chars().filter(|c| *c != ' ' && *c != '\t').collect();
    let upper = text.to_ascii_uppercase();

    for (prefix, radix) in [("&H", 16), ("&O", 8), ("&B", 2)] {
        if let Some(rest) = upper.strip_prefix(prefix) {
            let digits: String = rest.chars().take_while(|c| c.is_digit(radix)).collect();
            return i64::from_str_radix(&digits, radix).unwrap_or(0) as f64;
        }
    }

    let bytes = upper.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_point = false;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return 0.0;
    }

    // Optional exponent; D is BASIC's double-precision marker.
    let mut number = upper[..end].to_string();
    if end < bytes.len() && (bytes[end] == b'E' || bytes[end] == b'D') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            number.push('E');
            number.push_str(&upper[end + 1..exp_end]);
        }
    }

    number.parse().unwrap_or(0.0)
}

/// HEX$: two's-complement hex, 16 bits wide for INTEGER-range negatives.
pub fn hex(n: i64) -> String {
    if n >= 0 {
        format!("{:X}", n)
    } else if n >= i16::MIN as i64 {
        format!("{:X}", n as i16 as u16)
    } else {
        format!("{:X}", n as i32 as u32)
    }
}

/// OCT$: two's-complement octal, same width rules as [`hex`].
pub fn oct(n: i64) -> String {
    if n >= 0 {
        format!("{:o}", n)
    } else if n >= i16::MIN as i64 {
        format!("{:o}", n as i16 as u16)
    } else {
        format!("{:o}", n as i32 as u32)
    }
}

// ============================================================================
// Number Formatting
// ============================================================================

/// Formats a SINGLE the way PRINT shows it (no padding).
pub fn format_single(n: f32) -> String {
    if n != 0.0 && (n.abs() >= 1e7 || n.abs() < 1e-7) {
        return exponent_form(&format!("{:E}", n), 'E');
    }
    strip_leading_zero(format!("{}", n))
}

/// Formats a DOUBLE the way PRINT shows it (no padding).
pub fn format_double(n: f64) -> String {
    if n != 0.0 && (n.abs() >= 1e16 || n.abs() < 1e-16) {
        return exponent_form(&format!("{:E}", n), 'D');
    }
    strip_leading_zero(format!("{}", n))
}

/// STR$ adds a leading blank in place of the sign for non-negative numbers.
pub fn str_number(formatted: &str) -> String {
    if formatted.starts_with('-') {
        formatted.to_string()
    } else {
        format!(" {}", formatted)
    }
}

fn strip_leading_zero(s: String) -> String {
    if let Some(rest) = s.strip_prefix("0.") {
        format!(".{}", rest)
    } else if let Some(rest) = s.strip_prefix("-0.") {
        format!("-.{}", rest)
    } else {
        s
    }
}

/// Rewrites Rust's `1.5E10` into BASIC's `1.5E+10`.
fn exponent_form(rust: &str, marker: char) -> String {
    match rust.split_once('E') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}{}{}{:0>2}", mantissa, marker, sign, digits)
        }
        None => rust.to_string(),
    }
}

// ============================================================================
// PRINT USING
// ============================================================================

/// A value handed to [`format_using`].
#[derive(Debug, Clone, PartialEq)]
pub enum UsingArg {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Literal(String),
    Number {
        before: usize,
        after: Option<usize>,
        commas: bool,
        leading_plus: bool,
        trailing_minus: bool,
    },
    FirstChar,
    WholeString,
    Fixed(usize),
}

fn parse_template(template: &str) -> Vec<Field> {
    let chars: Vec<char> = template.chars().collect();
    let mut fields = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    let flush = |literal: &mut String, fields: &mut Vec<Field>| {
        if !literal.is_empty() {
            fields.push(Field::Literal(std::mem::take(literal)));
        }
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let starts_number = c == '#'
            || (c == '.' && next == Some('#'))
            || (c == '+' && matches!(next, Some('#') | Some('.')));

        if c == '_' {
            if let Some(escaped) = next {
                literal.push(escaped);
            }
            i += 2;
        } else if c == '!' {
            flush(&mut literal, &mut fields);
            fields.push(Field::FirstChar);
            i += 1;
        } else if c == '&' {
            flush(&mut literal, &mut fields);
            fields.push(Field::WholeString);
            i += 1;
        } else if c == '\\' {
            let close = chars[i + 1..].iter().position(|&ch| ch == '\\');
            match close {
                Some(offset) if chars[i + 1..i + 1 + offset].iter().all(|&ch| ch == ' ') => {
                    flush(&mut literal, &mut fields);
                    fields.push(Field::Fixed(offset + 2));
                    i += offset + 2;
                }
                _ => {
                    literal.push(c);
                    i += 1;
                }
            }
        } else if starts_number {
            flush(&mut literal, &mut fields);
            let leading_plus = c == '+';
            if leading_plus {
                i += 1;
            }
            let mut before = 0;
            let mut commas = false;
            while i < chars.len() && (chars[i] == '#' || (chars[i] == ',' && before > 0)) {
                if chars[i] == ',' {
                    commas = true;
                }
                before += 1;
                i += 1;
            }
            let mut after = None;
            if i < chars.len() && chars[i] == '.' {
                i += 1;
                let mut digits = 0;
                while i < chars.len() && chars[i] == '#' {
                    digits += 1;
                    i += 1;
                }
                after = Some(digits);
            }
            let trailing_minus = i < chars.len() && chars[i] == '-';
            if trailing_minus {
                i += 1;
            }
            fields.push(Field::Number {
                before,
                after,
                commas,
                leading_plus,
                trailing_minus,
            });
        } else {
            literal.push(c);
            i += 1;
        }
    }
    flush(&mut literal, &mut fields);
    fields
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_number_field(
    value: f64,
    before: usize,
    after: Option<usize>,
    commas: bool,
    leading_plus: bool,
    trailing_minus: bool,
) -> String {
    let negative = value < 0.0;
    let decimals = after.unwrap_or(0);
    let body = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (body, None),
    };
    let int_part = if commas {
        group_thousands(&int_part)
    } else {
        int_part
    };
    let int_part = if int_part == "0" && after.is_some() && before <= 1 && decimals > 0 {
        String::new()
    } else {
        int_part
    };

    let mut text = int_part;
    if after.is_some() {
        text.push('.');
        if let Some(frac) = frac_part {
            text.push_str(&frac);
        }
    }

    let sign_prefix = if leading_plus {
        if negative { "-" } else { "+" }
    } else if negative && !trailing_minus {
        "-"
    } else {
        ""
    };
    let width = before + after.map(|d| d + 1).unwrap_or(0) + usize::from(leading_plus);
    let mut out = format!("{}{}", sign_prefix, text);
    if out.chars().count() < width {
        out = format!("{:>width$}", out, width = width);
    } else if out.chars().count() > width {
        out = format!("%{}", out);
    }
    if trailing_minus {
        out.push(if negative { '-' } else { ' ' });
    }
    out
}

/// Formats `args` through a PRINT USING template.
///
/// The template is reused from the start when arguments remain after its
/// last field. Returns `None` when the template has no fields at all or an
/// argument's kind does not suit its field.
pub fn format_using(template: &str, args: &[UsingArg]) -> Option<String> {
    let fields = parse_template(template);
    if !fields.iter().any(|f| !matches!(f, Field::Literal(_))) {
        return None;
    }

    let mut out = String::new();
    let mut args = args.iter().peekable();
    let mut idx = 0;

    loop {
        let field = &fields[idx];
        match field {
            Field::Literal(text) => out.push_str(text),
            _ => {
                let Some(arg) = args.next() else { break };
                match (field, arg) {
                    (
                        Field::Number {
                            before,
                            after,
                            commas,
                            leading_plus,
                            trailing_minus,
                        },
                        UsingArg::Number(n),
                    ) => out.push_str(&format_number_field(
                        *n,
                        *before,
                        *after,
                        *commas,
                        *leading_plus,
                        *trailing_minus,
                    )),
                    (Field::FirstChar, UsingArg::Text(s)) => {
                        out.push_str(&left(s, 1));
                    }
                    (Field::WholeString, UsingArg::Text(s)) => out.push_str(s),
                    (Field::Fixed(n), UsingArg::Text(s)) => {
                        out.push_str(&format!("{:<width$}", left(s, *n as i64), width = *n));
                    }
                    _ => return None,
                }
            }
        }
        idx += 1;
        if idx == fields.len() {
            if args.peek().is_none() {
                break;
            }
            idx = 0;
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_right_mid() {
        assert_eq!(left("Hello", 2), "He");
        assert_eq!(left("Hello", 10), "Hello");
        assert_eq!(right("Hello", 3), "llo");
        assert_eq!(mid("Hello", 2, Some(3)), "ell");
        assert_eq!(mid("Hello", 3, None), "llo");
        assert_eq!(mid("Hello", 9, Some(2)), "");
    }

    #[test]
    fn test_instr() {
        assert_eq!(instr(1, "Hello World", "World"), 7);
        assert_eq!(instr(1, "Hello", "xyz"), 0);
        assert_eq!(instr(3, "abcabc", "a"), 4);
        assert_eq!(instr(1, "abc", ""), 1);
    }

    #[test]
    fn test_trim_and_fill() {
        assert_eq!(ltrim("  hi  "), "hi  ");
        assert_eq!(rtrim("  hi  "), "  hi");
        assert_eq!(space(3), "   ");
        assert_eq!(string_fill(4, '*'), "****");
    }

    #[test]
    fn test_chr_and_asc() {
        assert_eq!(chr(65).as_deref(), Some("A"));
        assert_eq!(chr(300), None);
        assert_eq!(asc("ABC"), Some(65));
        assert_eq!(asc(""), None);
    }

    #[test]
    fn test_val() {
        assert_eq!(val("42"), 42.0);
        assert_eq!(val("  -3.5xyz"), -3.5);
        assert_eq!(val("1 2 3"), 123.0);
        assert_eq!(val("&HFF"), 255.0);
        assert_eq!(val("1.5D2"), 150.0);
        assert_eq!(val("abc"), 0.0);
    }

    #[test]
    fn test_hex_oct() {
        assert_eq!(hex(255), "FF");
        assert_eq!(hex(-1), "FFFF");
        assert_eq!(hex(-70000), "FFFEEE90");
        assert_eq!(oct(8), "10");
    }

    #[test]
    fn test_format_numbers() {
        assert_eq!(format_single(3.0), "3");
        assert_eq!(format_single(0.5), ".5");
        assert_eq!(format_single(-0.25), "-.25");
        assert_eq!(format_single(1e10), "1E+10");
        assert_eq!(format_double(2.5), "2.5");
        assert_eq!(str_number("3"), " 3");
        assert_eq!(str_number("-3"), "-3");
    }

    #[test]
    fn test_using_numbers() {
        let out = format_using("###.##", &[UsingArg::Number(3.14159)]).unwrap();
        assert_eq!(out, "  3.14");
        let out = format_using("#,###", &[UsingArg::Number(1234.0)]).unwrap();
        assert_eq!(out, "1,234");
        let out = format_using("##", &[UsingArg::Number(1234.0)]).unwrap();
        assert_eq!(out, "%1234");
    }

    #[test]
    fn test_using_strings_and_repeat() {
        let out = format_using("[&] ", &[
            UsingArg::Text("a".into()),
            UsingArg::Text("b".into()),
        ])
        .unwrap();
        assert_eq!(out, "[a] [b] ");
        let out = format_using("!", &[UsingArg::Text("Hello".into())]).unwrap();
        assert_eq!(out, "H");
        let out = format_using("\\  \\|", &[UsingArg::Text("abcdef".into())]).unwrap();
        assert_eq!(out, "abcd|");
    }

    #[test]
    fn test_using_errors() {
        assert_eq!(format_using("no fields", &[UsingArg::Number(1.0)]), None);
        assert_eq!(format_using("##", &[UsingArg::Text("x".into())]), None);
    }
}
