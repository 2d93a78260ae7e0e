//! Template Preprocessing
//!
//! Wordは入力されたテキストを任意の位置でランに分割するため、
//! `{{ name }}` のようなタグの内部にXMLマークアップが混入する。
//! ここではタグを1つの連続した文字列に戻し、行・段落・ラン単位の拡張タグ
//! （`{%tr ...%}` / `{%tc ...%}` / `{%p ...%}` / `{%r ...%}` と `{{r ...}}`）を展開する。

/// 拡張タグを持つ要素（外側から順に処理する）
const BLOCK_ELEMENTS: [&str; 4] = ["tr", "tc", "p", "r"];

/// テンプレートエンジンに渡せる形にXMLを整える
pub(crate) fn prepare(xml: &str) -> String {
    let joined = join_split_delimiters(xml);
    let mut prepared = clean_tag_contents(&joined);
    for element in BLOCK_ELEMENTS {
        prepared = collapse_block_tags(&prepared, element);
    }
    split_rich_runs(&prepared)
}

/// 区切り文字の間に入り込んだマークアップを除去する
///
/// `{</w:t></w:r><w:r><w:t>{` → `{{`、`%</w:t>...<w:t>}` → `%}` のように、
/// 開始・終了の区切り文字の2文字の間にあるタグだけを取り除く。
fn join_split_delimiters(xml: &str) -> String {
    let bytes = xml.as_bytes();
    let mut out = String::with_capacity(xml.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        let followers: &[u8] = match bytes[i] {
            b'{' => b"{%#",
            b'%' | b'}' | b'#' => b"}",
            _ => {
                i += 1;
                continue;
            }
        };

        let after = skip_markup(bytes, i + 1);
        if after > i + 1 && after < bytes.len() && followers.contains(&bytes[after]) {
            out.push_str(&xml[last..=i]);
            last = after;
            i = after;
        } else {
            i += 1;
        }
    }

    out.push_str(&xml[last..]);
    out
}

/// `{{ }}` / `{% %}` / `{# #}` の内部からマークアップを除去し、引用符を正規化する
fn clean_tag_contents(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(start) = find_tag_open(rest) {
        let closer = match rest.as_bytes()[start + 1] {
            b'{' => "}}",
            b'%' => "%}",
            _ => "#}",
        };
        let body_start = start + 2;
        let Some(body_len) = rest[body_start..].find(closer) else {
            break;
        };
        let body_end = body_start + body_len;

        out.push_str(&rest[..body_start]);
        out.push_str(&normalize_quotes(&strip_markup(&rest[body_start..body_end])));
        out.push_str(closer);
        rest = &rest[body_end + closer.len()..];
    }

    out.push_str(rest);
    out
}

/// `{{` / `{%` / `{#` の位置を探す
pub(crate) fn find_tag_open(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let pos = from + offset;
        if matches!(bytes.get(pos + 1), Some(b'{') | Some(b'%') | Some(b'#')) {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

/// `{%tr ...%}` などを含む要素全体を `{% ... %}` に置き換える
///
/// 例えば `{%tr for row in 設備 %}` を含む表の行は、行ごと
/// `{% for row in 設備 %}` になる。
fn collapse_block_tags(xml: &str, element: &str) -> String {
    let marker = format!("{{%{} ", element);
    let open = format!("<w:{}", element);
    let close = format!("</w:{}>", element);

    let mut result = xml.to_string();
    let mut search_from = 0;

    while let Some(found) = result[search_from..].find(&marker) {
        let tag_start = search_from + found;
        let Some(tag_len) = result[tag_start..].find("%}") else {
            break;
        };
        let tag_end = tag_start + tag_len + 2;
        let replacement = format!("{{% {}%}}", &result[tag_start + marker.len()..tag_end - 2]);

        let element_start = find_element_start(&result[..tag_start], &open);
        let element_end = result[tag_end..]
            .find(&close)
            .map(|pos| tag_end + pos + close.len());

        let (start, end) = match element_start.zip(element_end) {
            Some(bounds) => bounds,
            None => (tag_start, tag_end),
        };
        result.replace_range(start..end, &replacement);
        search_from = start + replacement.len();
    }

    result
}

/// `{{r name}}` を含むランを分割し、タグをランの外に出す
///
/// `<w:r><w:rPr>P</w:rPr><w:t>前{{r x}}後</w:t></w:r>` は
/// `<w:r><w:rPr>P</w:rPr><w:t>前</w:t></w:r>{{r x}}<w:r><w:rPr>P</w:rPr><w:t xml:space="preserve">後</w:t></w:r>`
/// になる。展開された値はラン単位で挿入される。
fn split_rich_runs(xml: &str) -> String {
    const MARKER: &str = "{{r ";

    let mut result = xml.to_string();
    let mut search_from = 0;

    while let Some(found) = result[search_from..].find(MARKER) {
        let tag_start = search_from + found;
        let Some(tag_len) = result[tag_start..].find("}}") else {
            break;
        };
        let tag_end = tag_start + tag_len + 2;

        let Some(properties) = enclosing_run_properties(&result[..tag_start]) else {
            search_from = tag_end;
            continue;
        };

        let before = "</w:t></w:r>";
        let after = format!("<w:r>{}<w:t xml:space=\"preserve\">", properties);
        result.insert_str(tag_end, &after);
        result.insert_str(tag_start, before);
        search_from = tag_end + before.len() + after.len();
    }

    result
}

/// タグの直前が同じランのテキスト要素であれば、そのランの書式（`<w:rPr>`）を返す
fn enclosing_run_properties(before: &str) -> Option<&str> {
    let last_markup = before.rfind('<')?;
    let last_tag = &before[last_markup..];
    if !(last_tag.starts_with("<w:t>") || last_tag.starts_with("<w:t ")) {
        return None;
    }

    let run_start = find_element_start(before, "<w:r")?;
    if before[run_start..].contains("</w:r>") {
        return None;
    }

    let bytes = before.as_bytes();
    let content_start = find_tag_end(bytes, run_start)? + 1;
    let content = &before[content_start..];
    if !content.starts_with("<w:rPr") {
        return Some("");
    }
    let properties_end = match content.find("</w:rPr>") {
        Some(pos) => pos + "</w:rPr>".len(),
        None => find_tag_end(content.as_bytes(), 0)? + 1,
    };
    Some(&content[..properties_end])
}

/// 要素の開始タグ（`<w:tr>` や `<w:tr ...>`）の位置を後方から探す
///
/// `<w:trPr>` のように名前が前方一致するだけの要素は対象外。
fn find_element_start(haystack: &str, open: &str) -> Option<usize> {
    let mut end = haystack.len();
    while let Some(pos) = haystack[..end].rfind(open) {
        match haystack.as_bytes().get(pos + open.len()) {
            Some(b' ') | Some(b'>') => return Some(pos),
            _ => end = pos,
        }
    }
    None
}

/// 連続するタグを読み飛ばし、次の位置を返す
fn skip_markup(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos] == b'<' {
        match find_tag_end(bytes, pos) {
            Some(end) => pos = end + 1,
            None => break,
        }
    }
    pos
}

/// `start` から始まるタグの終端（`>`）の位置を返す
///
/// 属性値の引用符内にある `>` は終端とみなさない。
fn find_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut quote = None;
    for (offset, &b) in bytes.get(start..)?.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return Some(start + offset),
                _ => {}
            },
        }
    }
    None
}

/// マークアップを除去する
fn strip_markup(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            if let Some(end) = find_tag_end(bytes, i) {
                out.push_str(&text[last..i]);
                i = end + 1;
                last = i;
                continue;
            }
        }
        i += 1;
    }

    out.push_str(&text[last..]);
    out
}

/// Wordの自動変換による引用符と、エスケープされた引用符を元に戻す
fn normalize_quotes(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace(['\u{201C}', '\u{201D}', '\u{201E}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\u{00A0}', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_split_delimiters() {
        let xml = "<w:t>{</w:t></w:r><w:r><w:t>{ name }</w:t></w:r><w:r><w:t>}</w:t>";
        assert_eq!(join_split_delimiters(xml), "<w:t>{{ name }}</w:t>");

        let xml = "<w:t>{</w:t><w:t>% if x %</w:t><w:t>}</w:t>";
        assert_eq!(join_split_delimiters(xml), "<w:t>{% if x %}</w:t>");
    }

    #[test]
    fn test_join_keeps_unrelated_braces() {
        let xml = "<w:t>{</w:t></w:r><w:r><w:t>a}</w:t>";
        assert_eq!(join_split_delimiters(xml), xml);
    }

    #[test]
    fn test_clean_tag_contents() {
        let xml = "<w:t>{{ 效</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>率 }}</w:t>";
        assert_eq!(clean_tag_contents(xml), "<w:t>{{ 效率 }}</w:t>");

        let xml = "<w:t>{{ row[\u{201C}型號\u{201D}] }} and {{ row[&quot;台數&quot;] }}</w:t>";
        assert_eq!(
            clean_tag_contents(xml),
            "<w:t>{{ row[\"型號\"] }} and {{ row[\"台數\"] }}</w:t>"
        );
    }

    #[test]
    fn test_clean_skips_quoted_gt_in_attributes() {
        let xml = "{{ a<w:x w:val=\"1>2\"/>b }}";
        assert_eq!(clean_tag_contents(xml), "{{ ab }}");
    }

    #[test]
    fn test_collapse_table_row_tags() {
        let xml = concat!(
            "<w:tbl>",
            "<w:tr><w:trPr/><w:tc><w:p><w:r><w:t>{%tr for row in 設備 %}</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>{{ row.型號 }}</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>{%tr endfor %}</w:t></w:r></w:p></w:tc></w:tr>",
            "</w:tbl>"
        );
        assert_eq!(
            prepare(xml),
            concat!(
                "<w:tbl>",
                "{% for row in 設備 %}",
                "<w:tr><w:tc><w:p><w:r><w:t>{{ row.型號 }}</w:t></w:r></w:p></w:tc></w:tr>",
                "{% endfor %}",
                "</w:tbl>"
            )
        );
    }

    #[test]
    fn test_collapse_paragraph_tags() {
        let xml = concat!(
            "<w:p w:rsidR=\"00A1\"><w:pPr><w:jc w:val=\"left\"/></w:pPr><w:r><w:t>{%p if 備註 %}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>{{ 備註 }}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>{%p endif %}</w:t></w:r></w:p>"
        );
        assert_eq!(
            prepare(xml),
            "{% if 備註 %}<w:p><w:r><w:t>{{ 備註 }}</w:t></w:r></w:p>{% endif %}"
        );
    }

    #[test]
    fn test_split_rich_run_keeps_surrounding_text() {
        let xml = "<w:p><w:r><w:rPr><w:sz w:val=\"24\"/></w:rPr><w:t xml:space=\"preserve\">效率: {{r 效率}} %</w:t></w:r></w:p>";
        assert_eq!(
            prepare(xml),
            concat!(
                "<w:p><w:r><w:rPr><w:sz w:val=\"24\"/></w:rPr><w:t xml:space=\"preserve\">效率: </w:t></w:r>",
                "{{r 效率}}",
                "<w:r><w:rPr><w:sz w:val=\"24\"/></w:rPr><w:t xml:space=\"preserve\"> %</w:t></w:r></w:p>"
            )
        );
    }

    #[test]
    fn test_split_rich_run_without_properties() {
        let xml = "<w:r><w:t>{{r x}}</w:t></w:r>";
        assert_eq!(
            prepare(xml),
            "<w:r><w:t></w:t></w:r>{{r x}}<w:r><w:t xml:space=\"preserve\"></w:t></w:r>"
        );
    }

    #[test]
    fn test_find_element_start_ignores_property_elements() {
        let xml = "<w:tr><w:trPr><w:cantSplit/></w:trPr>";
        assert_eq!(find_element_start(xml, "<w:tr"), Some(0));
        assert_eq!(find_element_start("<w:rPr>", "<w:r"), None);
    }

    #[test]
    fn test_find_tag_open() {
        assert_eq!(find_tag_open("a { b {{ c"), Some(6));
        assert_eq!(find_tag_open("{%"), Some(0));
        assert_eq!(find_tag_open("{ } {"), None);
    }
}
