//! Character-level scanner for language-definition sources.
//!
//! The grammar is deliberately tiny and is consumed one character at a time
//! through an enumerated-state machine. Positions are tracked as 1-based
//! line/column pairs so every rejection can point at the offending
//! character.

use numbersim_error::{NumbersimError, Result};
use tracing::debug;

use crate::catalog::{Language, LanguageCatalog, MarkerIndex, ParseLimits};

/// Scanner states.
///
/// `Record` is entered when a paragraph-terminating newline is seen and is
/// resolved before the next character is consumed; the other five states
/// persist across characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Accumulating the language name.
    Name,
    /// Between the name (or a completed default designation) and the next
    /// marker token.
    Separator,
    /// Accumulating a marker token.
    Marker,
    /// After a completed marker: cardinality numbers, a further marker, or
    /// the `*` default designation may follow.
    AfterMarker,
    /// Accumulating a cardinality number.
    Number,
    /// Paragraph complete; finalize the pending language.
    Record,
}

pub(crate) struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    limits: &'a ParseLimits,
    state: State,
    languages: Vec<Language>,
    // Pending-paragraph accumulators.
    name: String,
    markers: Vec<String>,
    current_marker: String,
    table: Vec<Option<MarkerIndex>>,
    default_marker: Option<MarkerIndex>,
    number: Option<u64>,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(source: &'a str, limits: &'a ParseLimits) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            limits,
            state: State::Name,
            languages: Vec::new(),
            name: String::new(),
            markers: Vec::new(),
            current_marker: String::new(),
            table: vec![None; limits.cardinality_ceiling],
            default_marker: None,
            number: None,
        }
    }

    /// Consume the whole source and return the parsed languages in
    /// definition order.
    pub(crate) fn scan(mut self) -> Result<Vec<Language>> {
        while self.pos < self.src.len() {
            let c = self.src[self.pos];
            let (line, col) = (self.line, self.col);
            self.step(c, line, col)?;
            if self.state == State::Record {
                self.finalize_record()?;
                self.state = State::Name;
            }
            self.advance(c);
        }

        match self.state {
            State::Name if self.name.is_empty() => {}
            State::Separator => self.finalize_record()?,
            _ => {
                return Err(NumbersimError::UnexpectedEof {
                    line: self.line,
                    col: self.col,
                });
            }
        }

        Ok(self.languages)
    }

    fn advance(&mut self, c: u8) {
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    fn step(&mut self, c: u8, line: u32, col: u32) -> Result<()> {
        match self.state {
            State::Name => self.step_name(c, line, col),
            State::Separator => self.step_separator(c, line, col),
            State::Marker => self.step_marker(c, line, col),
            State::AfterMarker => self.step_after_marker(c, line, col),
            State::Number => self.step_number(c, line, col),
            // Resolved in `scan` before the next character.
            State::Record => Err(NumbersimError::internal(
                "scanner re-entered Record state".to_owned(),
            )),
        }
    }

    fn step_name(&mut self, c: u8, line: u32, col: u32) -> Result<()> {
        if c.is_ascii_alphabetic() {
            if self.name.len() >= self.limits.max_name_len {
                return Err(NumbersimError::syntax(line, col, "language name too long"));
            }
            self.name.push(char::from(c));
            Ok(())
        } else if c.is_ascii_whitespace() {
            // Whitespace before any name character (blank lines between
            // paragraphs included) is insignificant.
            if !self.name.is_empty() {
                self.state = State::Separator;
            }
            Ok(())
        } else {
            Err(unexpected(c, line, col))
        }
    }

    fn step_separator(&mut self, c: u8, line: u32, col: u32) -> Result<()> {
        if c == b'\n' {
            self.state = State::Record;
            Ok(())
        } else if c.is_ascii_whitespace() {
            Ok(())
        } else if c.is_ascii_alphabetic() {
            self.current_marker.push(char::from(c));
            self.state = State::Marker;
            Ok(())
        } else {
            Err(unexpected(c, line, col))
        }
    }

    fn step_marker(&mut self, c: u8, line: u32, col: u32) -> Result<()> {
        if c.is_ascii_alphabetic() {
            if self.current_marker.len() >= self.limits.max_marker_len {
                return Err(NumbersimError::syntax(line, col, "marker too long"));
            }
            self.current_marker.push(char::from(c));
            Ok(())
        } else if c == b'*' {
            // `plural*` — the token ends here and doubles as the default
            // designation; a cardinality may still follow.
            self.finish_marker(line, col)?;
            self.designate_default(line, col)?;
            self.state = State::AfterMarker;
            Ok(())
        } else if c.is_ascii_whitespace() {
            self.finish_marker(line, col)?;
            self.state = State::AfterMarker;
            Ok(())
        } else {
            Err(unexpected(c, line, col))
        }
    }

    fn step_after_marker(&mut self, c: u8, line: u32, col: u32) -> Result<()> {
        if c.is_ascii_digit() {
            self.number = Some(u64::from(c - b'0'));
            self.state = State::Number;
            Ok(())
        } else if c.is_ascii_alphabetic() {
            self.current_marker.push(char::from(c));
            self.state = State::Marker;
            Ok(())
        } else if c == b'*' {
            // `plural *` — designates the most recently completed marker.
            self.designate_default(line, col)?;
            self.state = State::Separator;
            Ok(())
        } else if c.is_ascii_whitespace() {
            Ok(())
        } else {
            Err(unexpected(c, line, col))
        }
    }

    fn step_number(&mut self, c: u8, line: u32, col: u32) -> Result<()> {
        if c.is_ascii_digit() {
            let digit = u64::from(c - b'0');
            let value = self
                .number
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| {
                    NumbersimError::syntax(line, col, "cardinality number too large")
                })?;
            self.number = Some(value);
            Ok(())
        } else if c == b'\n' {
            self.commit_number(line, col)?;
            self.state = State::Record;
            Ok(())
        } else if c.is_ascii_whitespace() {
            self.commit_number(line, col)?;
            self.state = State::AfterMarker;
            Ok(())
        } else {
            Err(unexpected(c, line, col))
        }
    }

    /// Close the in-progress marker token.
    fn finish_marker(&mut self, line: u32, col: u32) -> Result<()> {
        if self.markers.iter().any(|m| *m == self.current_marker) {
            return Err(NumbersimError::syntax(
                line,
                col,
                format!("duplicate marker `{}`", self.current_marker),
            ));
        }
        self.markers.push(std::mem::take(&mut self.current_marker));
        Ok(())
    }

    /// Designate the most recently completed marker as the default.
    fn designate_default(&mut self, line: u32, col: u32) -> Result<()> {
        if self.default_marker.is_some() {
            return Err(NumbersimError::syntax(
                line,
                col,
                "default marker already designated",
            ));
        }
        let last = u32::try_from(self.markers.len() - 1)
            .map_err(|_| NumbersimError::internal("marker index overflow"))?;
        self.default_marker = Some(MarkerIndex::new(last));
        Ok(())
    }

    /// Assign the just-scanned cardinality to the most recent marker.
    fn commit_number(&mut self, line: u32, col: u32) -> Result<()> {
        let value = self
            .number
            .take()
            .ok_or_else(|| NumbersimError::internal("number commit without digits"))?;
        if value == 0 {
            return Err(NumbersimError::syntax(
                line,
                col,
                "cardinality must be at least 1",
            ));
        }
        let ceiling = self.limits.cardinality_ceiling as u64;
        if value > ceiling {
            return Err(NumbersimError::syntax(
                line,
                col,
                format!("cardinality {value} exceeds maximum {ceiling}"),
            ));
        }
        let last = u32::try_from(self.markers.len() - 1)
            .map_err(|_| NumbersimError::internal("marker index overflow"))?;
        // A cardinality assigned twice keeps the later assignment.
        self.table[(value - 1) as usize] = Some(MarkerIndex::new(last));
        Ok(())
    }

    /// Finalize the pending paragraph into a `Language`.
    fn finalize_record(&mut self) -> Result<()> {
        let default = self
            .default_marker
            .take()
            .ok_or_else(|| NumbersimError::NoDefaultMarker {
                language: self.name.clone(),
            })?;

        if self.languages.len() >= self.limits.max_languages {
            return Err(NumbersimError::TooManyLanguages {
                max: self.limits.max_languages,
            });
        }

        let table: Vec<MarkerIndex> = self
            .table
            .iter()
            .map(|slot| slot.unwrap_or(default))
            .collect();

        let name = std::mem::take(&mut self.name);
        let markers = std::mem::take(&mut self.markers);
        debug!(language = %name, markers = markers.len(), "parsed language");

        let language = Language::new(name, markers, table, default);
        LanguageCatalog::insert(&mut self.languages, language);

        self.table = vec![None; self.limits.cardinality_ceiling];
        self.number = None;
        Ok(())
    }
}

fn unexpected(c: u8, line: u32, col: u32) -> NumbersimError {
    let rendered = if c.is_ascii_graphic() || c == b' ' {
        format!("unexpected character '{}'", char::from(c))
    } else {
        format!("unexpected character 0x{c:02x}")
    };
    NumbersimError::syntax(line, col, rendered)
}

#[cfg(test)]
mod tests {
    use numbersim_error::NumbersimError;

    use crate::catalog::{LanguageCatalog, ParseLimits};

    fn limits(ceiling: usize) -> ParseLimits {
        ParseLimits {
            cardinality_ceiling: ceiling,
            ..ParseLimits::default()
        }
    }

    fn parse(src: &str, ceiling: usize) -> LanguageCatalog {
        LanguageCatalog::parse(src, &limits(ceiling)).expect("source should parse")
    }

    fn parse_err(src: &str, ceiling: usize) -> NumbersimError {
        LanguageCatalog::parse(src, &limits(ceiling)).expect_err("source should be rejected")
    }

    fn marker_names(catalog: &LanguageCatalog, language: &str) -> Vec<String> {
        let lang = catalog.get(language).expect("language should exist");
        (1..=lang.cardinality_ceiling())
            .map(|c| {
                let idx = lang.marker_for(c).expect("cardinality within table");
                lang.marker_name(idx).to_owned()
            })
            .collect()
    }

    #[test]
    fn parses_single_language() {
        let catalog = parse("english singular 1 plural *\n", 3);
        assert_eq!(catalog.len(), 1);
        let english = catalog.get("english").expect("english should exist");
        assert_eq!(english.markers(), ["singular", "plural"]);
        assert_eq!(
            marker_names(&catalog, "english"),
            ["singular", "plural", "plural"]
        );
        assert_eq!(english.marker_name(english.default_marker()), "plural");
    }

    #[test]
    fn unassigned_cardinalities_fall_back_to_default() {
        // Markers a, b, c; 1→a, 2→b, default c; ceiling 5 resolves to
        // [a, b, c, c, c].
        let catalog = parse("numbers a 1 b 2 c *\n", 5);
        assert_eq!(
            marker_names(&catalog, "numbers"),
            ["a", "b", "c", "c", "c"]
        );
    }

    #[test]
    fn star_attached_to_marker_designates_default() {
        let catalog = parse("english singular 1 plural*\n", 3);
        let english = catalog.get("english").expect("english should exist");
        assert_eq!(english.marker_name(english.default_marker()), "plural");
    }

    #[test]
    fn star_attached_form_still_accepts_cardinalities() {
        // `dual* 2` designates dual as default and still maps cardinality 2.
        let catalog = parse("lang one 1 dual* 2 three 3\n", 4);
        let lang = catalog.get("lang").expect("lang should exist");
        assert_eq!(lang.marker_name(lang.default_marker()), "dual");
        assert_eq!(
            marker_names(&catalog, "lang"),
            ["one", "dual", "three", "dual"]
        );
    }

    #[test]
    fn star_after_whitespace_designates_previous_marker() {
        let catalog = parse("english singular 1 plural *\n", 2);
        let english = catalog.get("english").expect("english should exist");
        assert_eq!(english.marker_name(english.default_marker()), "plural");
    }

    #[test]
    fn name_may_sit_on_its_own_line() {
        let catalog = parse("english\nsingular 1 plural *\n", 3);
        assert_eq!(
            marker_names(&catalog, "english"),
            ["singular", "plural", "plural"]
        );
    }

    #[test]
    fn multiple_paragraphs() {
        let src = "english singular 1 plural *\n\nfrench sg singular 1 two 2 pl *\n";
        // `sg` has no explicit cardinality; it simply never wins.
        let catalog = parse(src, 3);
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            marker_names(&catalog, "french"),
            ["singular", "two", "pl"]
        );
    }

    #[test]
    fn missing_trailing_newline_is_accepted() {
        let catalog = parse("english singular 1 plural *", 2);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn empty_source_yields_empty_catalog() {
        assert!(parse("", 4).is_empty());
        assert!(parse("\n\n  \n", 4).is_empty());
    }

    #[test]
    fn later_cardinality_assignment_wins() {
        let catalog = parse("lang a 1 b 1 c *\n", 2);
        assert_eq!(marker_names(&catalog, "lang"), ["b", "c"]);
    }

    #[test]
    fn duplicate_language_first_wins() {
        let src = "dup a 1 b *\n\ndup x 1 y *\n";
        let catalog = parse(src, 2);
        assert_eq!(catalog.len(), 1);
        assert_eq!(marker_names(&catalog, "dup"), ["a", "b"]);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let catalog = parse("English singular 1 plural *\n", 2);
        assert!(catalog.get("English").is_some());
        assert!(catalog.get("english").is_none());
    }

    #[test]
    fn rejects_missing_default_marker() {
        let err = parse_err("english singular 1\n", 2);
        assert!(
            matches!(err, NumbersimError::NoDefaultMarker { language } if language == "english")
        );
    }

    #[test]
    fn rejects_unexpected_character_with_position() {
        let err = parse_err("english singular ?\n", 2);
        match err {
            NumbersimError::Syntax { line, col, detail } => {
                assert_eq!(line, 1);
                assert_eq!(col, 18);
                assert!(detail.contains('?'), "detail should name the character");
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_cardinality_zero() {
        let err = parse_err("english singular 0 plural *\n", 2);
        assert!(matches!(err, NumbersimError::Syntax { .. }));
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn rejects_cardinality_above_ceiling() {
        let err = parse_err("english singular 9 plural *\n", 4);
        assert!(err.to_string().contains("exceeds maximum 4"));
    }

    #[test]
    fn rejects_second_default_designation() {
        let err = parse_err("english singular* 1 plural *\n", 2);
        assert!(err.to_string().contains("already designated"));
    }

    #[test]
    fn rejects_duplicate_marker() {
        let err = parse_err("english one 1 one 2 other *\n", 3);
        assert!(err.to_string().contains("duplicate marker"));
    }

    #[test]
    fn rejects_overlong_name() {
        let custom = ParseLimits {
            max_name_len: 4,
            ..ParseLimits::default()
        };
        let err = LanguageCatalog::parse("english singular 1 plural *\n", &custom)
            .expect_err("name above limit should be rejected");
        assert!(err.to_string().contains("name too long"));
    }

    #[test]
    fn rejects_overlong_marker() {
        let custom = ParseLimits {
            max_marker_len: 3,
            ..ParseLimits::default()
        };
        let err = LanguageCatalog::parse("english singular 1 pl *\n", &custom)
            .expect_err("marker above limit should be rejected");
        assert!(err.to_string().contains("marker too long"));
    }

    #[test]
    fn rejects_too_many_languages() {
        let custom = ParseLimits {
            max_languages: 1,
            ..ParseLimits::default()
        };
        let src = "one a 1 b *\n\ntwo c 1 d *\n";
        let err = LanguageCatalog::parse(src, &custom)
            .expect_err("second language should exceed capacity");
        assert!(matches!(err, NumbersimError::TooManyLanguages { max: 1 }));
    }

    #[test]
    fn rejects_eof_inside_name() {
        let err = parse_err("english", 2);
        assert!(matches!(err, NumbersimError::UnexpectedEof { .. }));
    }

    #[test]
    fn rejects_eof_inside_number() {
        let err = parse_err("english singular 1", 2);
        assert!(matches!(err, NumbersimError::UnexpectedEof { .. }));
    }

    #[test]
    fn rejects_eof_after_marker() {
        // AfterMarker is not a paragraph boundary: the scanner cannot tell
        // whether a cardinality or the default designation was coming.
        let err = parse_err("english singular 1 plural * extra ", 2);
        assert!(matches!(err, NumbersimError::UnexpectedEof { .. }));
    }

    #[test]
    fn eof_in_separator_finalizes_paragraph() {
        let catalog = parse("english singular 1 plural *  ", 2);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn rejects_digit_before_any_marker() {
        let err = parse_err("english 3 singular *\n", 4);
        assert!(matches!(err, NumbersimError::Syntax { .. }));
    }

    #[test]
    fn display_dumps_resolved_table() {
        let catalog = parse("english singular 1 plural *\n", 3);
        let english = catalog.get("english").expect("english should exist");
        assert_eq!(
            english.to_string(),
            "english [2] (def = plural) singular plural > singular plural plural"
        );
    }
}
