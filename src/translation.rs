use std::borrow::Cow;

/// Target placeholder dialect for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Numbered placeholders like `$1` (`PostgreSQL` wire protocol).
    Numbered,
    /// Positional placeholders like `?` (`MySQL` wire protocol).
    Positional,
}

/// Rewrite statement placeholders into the `target` dialect.
///
/// Queries are written with portable `?` placeholders (numbered `?1`/`$1`
/// forms are also accepted); this pass renumbers or strips them as the
/// backend requires. String literals, quoted identifiers, comments, and
/// dollar-quoted blocks are skipped.
///
/// Warning: a bare `?` outside a literal is always treated as a placeholder,
/// so SQL relying on the `PostgreSQL` jsonb `?` operator must spell it as the
/// equivalent function call instead. Returns a borrowed `Cow` when nothing
/// needed rewriting.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    let src = sql.as_bytes();
    // MySQL strings honor backslash escapes; standard SQL strings do not.
    let to_positional = target == PlaceholderStyle::Positional;

    let mut rewritten: Option<String> = None;
    // Start of the input span not yet flushed into `rewritten`.
    let mut copied = 0;
    let mut seq: u32 = 1;
    let mut pos = 0;

    while pos < src.len() {
        match src[pos] {
            b'\'' => pos = skip_quoted(src, pos, b'\'', to_positional),
            b'"' => pos = skip_quoted(src, pos, b'"', to_positional),
            b'`' => pos = skip_quoted(src, pos, b'`', false),
            b'-' if src[pos..].starts_with(b"--") => pos = skip_line_comment(src, pos),
            b'/' if src[pos..].starts_with(b"/*") => pos = skip_block_comment(src, pos),
            b'$' => {
                if let Some(opener) = dollar_opener(src, pos) {
                    pos = skip_dollar_quoted(src, pos + opener.len(), opener);
                } else if let Some(end) = digit_run_end(src, pos + 1) {
                    if to_positional {
                        let buf = grow(&mut rewritten, sql);
                        buf.push_str(&sql[copied..pos]);
                        buf.push('?');
                        copied = end;
                    }
                    pos = end;
                } else {
                    pos += 1;
                }
            }
            b'?' => {
                let digits = digit_run_end(src, pos + 1);
                match target {
                    PlaceholderStyle::Numbered => {
                        let buf = grow(&mut rewritten, sql);
                        buf.push_str(&sql[copied..pos]);
                        buf.push('$');
                        if let Some(end) = digits {
                            buf.push_str(&sql[pos + 1..end]);
                            copied = end;
                            pos = end;
                        } else {
                            buf.push_str(&seq.to_string());
                            seq += 1;
                            copied = pos + 1;
                            pos += 1;
                        }
                    }
                    PlaceholderStyle::Positional => {
                        if let Some(end) = digits {
                            let buf = grow(&mut rewritten, sql);
                            buf.push_str(&sql[copied..pos]);
                            buf.push('?');
                            copied = end;
                            pos = end;
                        } else {
                            pos += 1;
                        }
                    }
                }
            }
            _ => pos += 1,
        }
    }

    match rewritten {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

fn grow<'a>(rewritten: &'a mut Option<String>, sql: &str) -> &'a mut String {
    rewritten.get_or_insert_with(|| String::with_capacity(sql.len()))
}

/// Advance past a quoted region opened by `delim` at `open`. A doubled
/// delimiter is an escape. Unterminated regions run to the end of input.
fn skip_quoted(src: &[u8], open: usize, delim: u8, backslash_escapes: bool) -> usize {
    let mut pos = open + 1;
    while pos < src.len() {
        let b = src[pos];
        if backslash_escapes && b == b'\\' {
            pos += 2;
        } else if b == delim {
            if src.get(pos + 1) == Some(&delim) {
                pos += 2;
            } else {
                return pos + 1;
            }
        } else {
            pos += 1;
        }
    }
    pos
}

fn skip_line_comment(src: &[u8], open: usize) -> usize {
    let mut pos = open + 2;
    while pos < src.len() {
        if src[pos] == b'\n' {
            return pos + 1;
        }
        pos += 1;
    }
    pos
}

/// Block comments nest, matching the `PostgreSQL` lexer.
fn skip_block_comment(src: &[u8], open: usize) -> usize {
    let mut depth = 1u32;
    let mut pos = open + 2;
    while pos < src.len() && depth > 0 {
        if src[pos..].starts_with(b"/*") {
            depth += 1;
            pos += 2;
        } else if src[pos..].starts_with(b"*/") {
            depth -= 1;
            pos += 2;
        } else {
            pos += 1;
        }
    }
    pos
}

/// The full `$tag$` delimiter opening at `pos`, if one does. Tags are runs
/// of `[A-Za-z0-9_]`, possibly empty (`$$`).
fn dollar_opener(src: &[u8], pos: usize) -> Option<&[u8]> {
    let rest = &src[pos + 1..];
    let tag_len = rest
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'_'))?;
    if rest[tag_len] == b'$' {
        Some(&src[pos..pos + tag_len + 2])
    } else {
        None
    }
}

fn skip_dollar_quoted(src: &[u8], body_start: usize, opener: &[u8]) -> usize {
    let mut pos = body_start;
    while pos < src.len() {
        if src[pos..].starts_with(opener) {
            return pos + opener.len();
        }
        pos += 1;
    }
    pos
}

fn digit_run_end(src: &[u8], from: usize) -> Option<usize> {
    let run = src[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    (run > 0).then_some(from + run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_bare_placeholders_sequentially() {
        let sql = "select * from t where a = ? and b = ? and c = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Numbered);
        assert_eq!(res, "select * from t where a = $1 and b = $2 and c = $3");
    }

    #[test]
    fn keeps_explicit_numbers() {
        let sql = "select * from t where a = ?2 and b = ?1";
        let res = translate_placeholders(sql, PlaceholderStyle::Numbered);
        assert_eq!(res, "select * from t where a = $2 and b = $1");
    }

    #[test]
    fn strips_numbers_for_positional_dialect() {
        let sql = "insert into gadgets values($1, $2, $3)";
        let res = translate_placeholders(sql, PlaceholderStyle::Positional);
        assert_eq!(res, "insert into gadgets values(?, ?, ?)");
    }

    #[test]
    fn bare_placeholders_pass_through_positional() {
        let sql = "select * from t where a = ? and b = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Positional);
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }

    #[test]
    fn literals_and_comments_left_alone() {
        let sql = "select 'a?1b', ? -- x?\n/* ? */ from widgets where w = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Numbered);
        assert_eq!(res, "select 'a?1b', $1 -- x?\n/* ? */ from widgets where w = $2");
    }

    #[test]
    fn nested_block_comments() {
        let sql = "/* a /* b */ ? */ select ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Numbered);
        assert_eq!(res, "/* a /* b */ ? */ select $1");
    }

    #[test]
    fn skips_backtick_identifiers() {
        let sql = "select `odd?name` from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Numbered);
        assert_eq!(res, "select `odd?name` from t where a = $1");
    }

    #[test]
    fn dollar_quoted_bodies_left_alone() {
        let sql = "$fn$ update t set a = $1 $fn$ where b = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Positional);
        assert_eq!(res, "$fn$ update t set a = $1 $fn$ where b = ?");
    }

    #[test]
    fn empty_dollar_tag() {
        let sql = "$$ body with $1 $$ where a = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Positional);
        assert_eq!(res, "$$ body with $1 $$ where a = ?");
    }

    #[test]
    fn honors_backslash_escapes_in_mysql_strings() {
        let sql = r"select 'it\'s ?' from t where a = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Positional);
        assert_eq!(res, r"select 'it\'s ?' from t where a = ?");
    }

    #[test]
    fn preserves_multibyte_text_around_replacements() {
        let sql = "select 'héllo', ? from t where b = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Numbered);
        assert_eq!(res, "select 'héllo', $1 from t where b = $2");
    }

    #[test]
    fn untouched_statements_stay_borrowed() {
        let sql = "select 1";
        assert!(matches!(
            translate_placeholders(sql, PlaceholderStyle::Numbered),
            Cow::Borrowed(_)
        ));
    }
}
