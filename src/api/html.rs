//! Tolerant HTML scanning for the exchange pages.
//!
//! The pages are small and regular, so this works on case-insensitive tag
//! blocks instead of a full DOM: find the block, strip the markup inside each
//! cell, decode the handful of entities the site emits and normalize
//! whitespace. Tag detection runs on an ASCII-lowercased copy, which keeps
//! byte offsets identical to the original text.

/// Rows of the first `<table>` in the document, header row included.
///
/// Rows without any `<th>`/`<td>` cell are skipped. Returns an empty vector
/// when the document has no table.
pub fn first_table_rows(html: &str) -> Vec<Vec<String>> {
    match find_block(html, "table", 0) {
        Some((start, end)) => table_rows(&html[start..end]),
        None => Vec::new(),
    }
}

/// Rows of a table block
pub fn table_rows(table: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut cursor = 0;

    while let Some((start, end)) = find_block(table, "tr", cursor) {
        let cells = row_cells(&table[start..end]);
        if !cells.is_empty() {
            rows.push(cells);
        }
        cursor = end;
    }

    rows
}

/// `value` attributes of the `<option>`s inside `<select id="{select_id}">`,
/// or inside the first `<select>` when no select carries that id.
pub fn select_option_values(html: &str, select_id: &str) -> Vec<String> {
    let lower = html.to_ascii_lowercase();
    let wanted = select_id.to_ascii_lowercase();

    let mut chosen = None;
    let mut cursor = 0;
    while let Some((start, end)) = find_block(html, "select", cursor) {
        let open_end = lower[start..end].find('>').map(|i| start + i).unwrap_or(end);
        let id = attribute(&html[start..open_end], "id").map(|v| v.to_ascii_lowercase());
        if id.as_deref() == Some(wanted.as_str()) {
            chosen = Some((start, end));
            break;
        }
        if chosen.is_none() {
            chosen = Some((start, end));
        }
        cursor = end;
    }

    let Some((start, end)) = chosen else {
        return Vec::new();
    };

    let block = &html[start..end];
    let block_lower = &lower[start..end];
    let mut values = Vec::new();
    let mut pos = 0;
    while let Some(offset) = find_tag_open(block_lower, "option", pos) {
        let tag_end = block_lower[offset..].find('>').map(|i| offset + i).unwrap_or(block.len());
        if let Some(value) = attribute(&block[offset..tag_end], "value") {
            let value = decode_entities(&value);
            let value = value.trim();
            if !value.is_empty() {
                values.push(value.to_string());
            }
        }
        pos = tag_end;
    }

    values
}

fn row_cells(row: &str) -> Vec<String> {
    let lower = row.to_ascii_lowercase();
    let mut cells = Vec::new();
    let mut cursor = 0;

    loop {
        let th = find_tag_open(&lower, "th", cursor);
        let td = find_tag_open(&lower, "td", cursor);
        let (tag, start) = match (th, td) {
            (Some(a), Some(b)) if a < b => ("th", a),
            (_, Some(b)) => ("td", b),
            (Some(a), None) => ("th", a),
            (None, None) => break,
        };

        let content_start = match lower[start..].find('>') {
            Some(i) => start + i + 1,
            None => break,
        };
        let close = format!("</{}", tag);
        // Unclosed cells run to the next cell or the end of the row
        let content_end = lower[content_start..]
            .find(&close)
            .map(|i| content_start + i)
            .or_else(|| {
                let next_td = find_tag_open(&lower, "td", content_start);
                let next_th = find_tag_open(&lower, "th", content_start);
                next_td.into_iter().chain(next_th).min()
            })
            .unwrap_or(row.len());

        cells.push(cell_text(&row[content_start..content_end]));

        cursor = match lower[content_end..].find('>') {
            Some(i) if lower[content_end..].starts_with("</") => content_end + i + 1,
            _ => content_end,
        };
    }

    cells
}

/// Visible text of a fragment: tags removed, entities decoded, whitespace collapsed
pub fn cell_text(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Byte range `[open, close_end)` of the next `<tag ...> ... </tag>` at or after `from`
fn find_block(html: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let lower = html.get(from..)?.to_ascii_lowercase();
    let start = find_tag_open(&lower, tag, 0)?;
    let close = format!("</{}", tag);
    let end = match lower[start..].find(&close) {
        Some(i) => {
            let close_start = start + i;
            lower[close_start..]
                .find('>')
                .map(|j| close_start + j + 1)
                .unwrap_or(lower.len())
        }
        None => lower.len(),
    };
    Some((from + start, from + end))
}

/// Position of the next opening `<tag` that is not a prefix of a longer tag name
fn find_tag_open(lower: &str, tag: &str, from: usize) -> Option<usize> {
    let needle = format!("<{}", tag);
    let mut pos = from;
    while let Some(i) = lower.get(pos..)?.find(&needle) {
        let start = pos + i;
        let after = start + needle.len();
        match lower.as_bytes().get(after) {
            Some(b) if b.is_ascii_alphanumeric() || *b == b'-' => pos = after,
            _ => return Some(start),
        }
    }
    None
}

/// Value of `name="..."` (or single-quoted / bare) inside an opening tag
fn attribute(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let needle = format!("{}=", name);
    let mut pos = 0;
    while let Some(i) = lower[pos..].find(&needle) {
        let start = pos + i;
        let preceded_ok = start == 0
            || lower.as_bytes()[start - 1].is_ascii_whitespace();
        let value_start = start + needle.len();
        pos = value_start;
        if !preceded_ok {
            continue;
        }

        let rest = &tag[value_start..];
        return match rest.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let inner = &rest[1..];
                let end = inner.find(q).unwrap_or(inner.len());
                Some(inner[..end].to_string())
            }
            Some(_) => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                    .unwrap_or(rest.len());
                Some(rest[..end].to_string())
            }
            None => Some(String::new()),
        };
    }
    None
}
