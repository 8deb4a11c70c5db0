//! Label- and symbol-anchored field extraction over page text.
//!
//! The quote page has no stable API, so every field is located by pattern.
//! Each field is described once in [`FIELD_TABLE`]: where its value sits
//! (right after a currency symbol, or right after a literal page label) and
//! what a complete value looks like. Extraction walks the table, so adding or
//! retuning a field is a data change.
//!
//! A field takes the first candidate after its anchor that is a complete
//! number in the field's format. Tokens that do not fit are skipped rather
//! than cut down; a field with no valid candidate is absent.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Currency symbol that prefixes the traded price.
pub const RUPEE: &str = "\u{20B9}";

/// Phrase naming the front-month contract, e.g. `Silver 5 Dec Fut`.
const INSTRUMENT_PATTERN: &str = r"Silver\s+\d{1,2}\s+[A-Z][a-z]{2,8}\s+Fut";

/// Optional textual fields a quote page can yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CurrentPrice,
    Open,
    PreviousClose,
    FiftyTwoWeekLow,
    FiftyTwoWeekHigh,
    Volume,
    OpenInterestLots,
    LotSize,
}

impl Field {
    /// Key used for the field in the JSON report.
    pub fn key(self) -> &'static str {
        match self {
            Field::CurrentPrice => "current_price",
            Field::Open => "open",
            Field::PreviousClose => "previous_close",
            Field::FiftyTwoWeekLow => "fifty_two_week_low",
            Field::FiftyTwoWeekHigh => "fifty_two_week_high",
            Field::Volume => "volume",
            Field::OpenInterestLots => "open_interest_lots",
            Field::LotSize => "lot_size",
        }
    }
}

/// What immediately precedes a field's value on the page.
#[derive(Debug, Clone, Copy)]
pub enum Anchor {
    /// Currency symbol directly followed by the number.
    Currency(&'static str),
    /// Literal label text, then whitespace, then the number.
    Label(&'static str),
}

/// Accepted shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// Optional thousands separators, exactly two fractional digits.
    Price,
    /// Integer with optional thousands separators.
    Count,
    /// Plain digits.
    Integer,
}

impl NumberFormat {
    fn validator(self) -> &'static Regex {
        static PRICE: OnceLock<Regex> = OnceLock::new();
        static COUNT: OnceLock<Regex> = OnceLock::new();
        static INTEGER: OnceLock<Regex> = OnceLock::new();
        match self {
            NumberFormat::Price => PRICE
                .get_or_init(|| Regex::new(r"^\d(?:,?\d)*\.\d{2}$").expect("price regex is valid")),
            NumberFormat::Count => {
                COUNT.get_or_init(|| Regex::new(r"^\d(?:,?\d)*$").expect("count regex is valid"))
            }
            NumberFormat::Integer => {
                INTEGER.get_or_init(|| Regex::new(r"^\d+$").expect("integer regex is valid"))
            }
        }
    }

    /// Whether `token` is a complete value in this format.
    pub fn accepts(self, token: &str) -> bool {
        self.validator().is_match(token)
    }
}

/// One row of the extraction table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub anchor: Anchor,
    pub format: NumberFormat,
}

/// Every extractable field, with labels exactly as the source page prints them.
pub const FIELD_TABLE: &[FieldSpec] = &[
    FieldSpec {
        field: Field::CurrentPrice,
        anchor: Anchor::Currency(RUPEE),
        format: NumberFormat::Price,
    },
    FieldSpec {
        field: Field::Open,
        anchor: Anchor::Label("Open"),
        format: NumberFormat::Price,
    },
    FieldSpec {
        field: Field::PreviousClose,
        anchor: Anchor::Label("Prev. Close"),
        format: NumberFormat::Price,
    },
    FieldSpec {
        field: Field::FiftyTwoWeekLow,
        anchor: Anchor::Label("52W Low"),
        format: NumberFormat::Price,
    },
    FieldSpec {
        field: Field::FiftyTwoWeekHigh,
        anchor: Anchor::Label("52W High"),
        format: NumberFormat::Price,
    },
    FieldSpec {
        field: Field::Volume,
        anchor: Anchor::Label("Volume (qty)"),
        format: NumberFormat::Count,
    },
    FieldSpec {
        field: Field::OpenInterestLots,
        anchor: Anchor::Label("Open Interest (lots)"),
        format: NumberFormat::Count,
    },
    FieldSpec {
        field: Field::LotSize,
        anchor: Anchor::Label("Lot Size"),
        format: NumberFormat::Integer,
    },
];

/// Values found on one page. `None` means the page did not yield the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub current_price: Option<String>,
    pub open: Option<String>,
    pub previous_close: Option<String>,
    pub fifty_two_week_low: Option<String>,
    pub fifty_two_week_high: Option<String>,
    pub volume: Option<String>,
    pub open_interest_lots: Option<String>,
    pub lot_size: Option<String>,
}

impl ExtractedFields {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::CurrentPrice => self.current_price.as_deref(),
            Field::Open => self.open.as_deref(),
            Field::PreviousClose => self.previous_close.as_deref(),
            Field::FiftyTwoWeekLow => self.fifty_two_week_low.as_deref(),
            Field::FiftyTwoWeekHigh => self.fifty_two_week_high.as_deref(),
            Field::Volume => self.volume.as_deref(),
            Field::OpenInterestLots => self.open_interest_lots.as_deref(),
            Field::LotSize => self.lot_size.as_deref(),
        }
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::CurrentPrice => &mut self.current_price,
            Field::Open => &mut self.open,
            Field::PreviousClose => &mut self.previous_close,
            Field::FiftyTwoWeekLow => &mut self.fifty_two_week_low,
            Field::FiftyTwoWeekHigh => &mut self.fifty_two_week_high,
            Field::Volume => &mut self.volume,
            Field::OpenInterestLots => &mut self.open_interest_lots,
            Field::LotSize => &mut self.lot_size,
        }
    }

    /// Number of fields that were found.
    pub fn found(&self) -> usize {
        FIELD_TABLE
            .iter()
            .filter(|spec| self.get(spec.field).is_some())
            .count()
    }
}

/// Candidate pattern per table row, compiled once.
fn compiled_table() -> &'static [(FieldSpec, Regex)] {
    static TABLE: OnceLock<Vec<(FieldSpec, Regex)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        FIELD_TABLE
            .iter()
            .map(|spec| {
                let pattern = match spec.anchor {
                    Anchor::Currency(symbol) => {
                        format!(r"{}(\d[\d,.]*)", regex::escape(symbol))
                    }
                    Anchor::Label(label) => {
                        format!(r"\b{}\s*(\d[\d,.]*)", regex::escape(label))
                    }
                };
                let re = Regex::new(&pattern).expect("field pattern is valid");
                (*spec, re)
            })
            .collect()
    })
}

fn instrument_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(INSTRUMENT_PATTERN).expect("instrument regex is valid"))
}

/// Slice of `text` searched for a field.
///
/// The traded price is looked for after the contract name when the page
/// prints one, which skips the unrelated rupee amounts in headers and ads.
fn search_region(text: &str, field: Field) -> &str {
    if field != Field::CurrentPrice {
        return text;
    }
    match instrument_regex().find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// First anchored token in `region` that is a complete value for `spec`.
fn find_value(region: &str, spec: &FieldSpec, re: &Regex) -> Option<String> {
    re.captures_iter(region).find_map(|caps| {
        let token = caps.get(1)?.as_str();
        // A sentence may end right after the number.
        let token = token.trim_end_matches(['.', ',']);
        spec.format.accepts(token).then(|| token.to_string())
    })
}

/// Run every table row against `text`. Rows are independent of each other.
pub fn extract_fields(text: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::default();

    for (spec, re) in compiled_table() {
        let region = search_region(text, spec.field);
        match find_value(region, spec, re) {
            Some(value) => {
                tracing::debug!("{} = {value}", spec.field.key());
                *fields.slot(spec.field) = Some(value);
            }
            None => tracing::debug!("{} not found on page", spec.field.key()),
        }
    }

    fields
}

/// Whether the traded price is present in `text`.
pub fn has_primary_quote(text: &str) -> bool {
    let Some((spec, re)) = compiled_table()
        .iter()
        .find(|(spec, _)| spec.field == Field::CurrentPrice)
    else {
        return false;
    };
    find_value(search_region(text, Field::CurrentPrice), spec, re).is_some()
}

/// Elements hidden from the rendered page.
fn is_hidden(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "template")
}

/// Elements that start a new line when rendered. Text inside one inline run
/// is joined as-is, so `<span>A</span><span>B</span>` reads `AB`.
fn is_block(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "body"
            | "br"
            | "caption"
            | "dd"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "head"
            | "header"
            | "hr"
            | "li"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "tbody"
            | "td"
            | "tfoot"
            | "th"
            | "thead"
            | "title"
            | "tr"
            | "ul"
    )
}

/// Accumulates rendered text with whitespace collapsed to single spaces.
#[derive(Default)]
struct TextSink {
    out: String,
    pending_space: bool,
}

impl TextSink {
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            if self.pending_space && !self.out.is_empty() {
                self.out.push(' ');
            }
            self.pending_space = false;
            self.out.push(c);
        }
    }

    fn push_break(&mut self) {
        self.pending_space = true;
    }

    fn walk(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if is_hidden(name) {
            return;
        }
        let block = is_block(name);
        if block {
            self.push_break();
        }
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.walk(child);
                    }
                }
                _ => {}
            }
        }
        if block {
            self.push_break();
        }
    }
}

/// Visible text of an HTML document, whitespace-collapsed.
///
/// Script, style, noscript and template contents are dropped. Block elements
/// and `<br>` separate their text with a space; adjacent inline text and text
/// split by comments is joined directly, as a browser lays it out.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut sink = TextSink::default();
    sink.walk(document.root_element());
    sink.out
}
