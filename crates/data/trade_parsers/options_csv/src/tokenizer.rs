use serde::Serialize;

use crate::error::ImportError;

const CANDIDATE_DELIMITERS: [char; 3] = [',', ';', '\t'];

/// One file split into a header row and data rows.
///
/// Rows are aligned with `headers`: short rows are padded with empty cells so
/// every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedCsv {
    pub delimiter: char,
    pub headers: Vec<String>,
    pub norm_headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Picks the delimiter with the most occurrences in the first non-empty
/// line. Ties and lines without any candidate fall back to comma.
pub fn detect_delimiter(text: &str) -> char {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut best = ',';
    let mut best_count = 0;
    for d in CANDIDATE_DELIMITERS {
        let count = first.matches(d).count();
        if count > best_count {
            best = d;
            best_count = count;
        }
    }
    best
}

/// Lowercase, fold accents, collapse whitespace and keep `[a-z0-9 %/._-]`.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();

    let mut folded = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if is_combining_mark(c) {
            continue;
        }
        folded.push(fold_accent(c));
    }

    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || " %/._-".contains(*c))
        .collect()
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Lowercase Latin-1 and Latin Extended-A letters to their base letter.
/// Letters without a canonical decomposition (æ, ø, ß, đ) pass through and
/// are later dropped by the character filter.
fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

/// Parses one file. The first non-empty line is the header row; rows whose
/// cells are all blank are dropped.
pub fn parse_csv(text: &str) -> Result<ParsedCsv, ImportError> {
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = detect_delimiter(text);

    let start = first_content_offset(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(text[start..].as_bytes());

    let mut records = reader.records();

    let headers: Vec<String> = match records.next() {
        Some(rec) => rec?.iter().map(|h| h.trim().to_string()).collect(),
        None => Vec::new(),
    };
    let norm_headers = headers.iter().map(|h| normalize_header(h)).collect();

    let mut rows = Vec::new();
    for rec in records {
        let rec = rec?;
        if rec.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let mut cells: Vec<String> = rec.iter().take(headers.len()).map(str::to_string).collect();
        cells.resize(headers.len(), String::new());
        rows.push(cells);
    }

    Ok(ParsedCsv {
        delimiter,
        headers,
        norm_headers,
        rows,
    })
}

fn first_content_offset(text: &str) -> usize {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            return offset;
        }
        offset += line.len();
    }
    offset
}
