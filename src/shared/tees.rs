use crate::shared::xml::Element;
use anyhow::{Context, Result};
use std::collections::HashMap;
use thiserror::Error;

// Leaf errors raised while turning a TEES subtree into the document model.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("malformed character offset `{0}`")]
    BadOffset(String),
    #[error("character offset `{0}` ends before it starts")]
    ReversedOffset(String),
    #[error("dependency {dependency} refers to unknown token `{token}`")]
    UnknownToken { dependency: String, token: String },
}

// Entity type abbreviations renamed by `convert --retype`.
const TYPE_MAP: &[(&str, &str)] = &[
    ("cel", "Cell"),
    ("che", "Chemical"),
    ("dis", "Disease"),
    ("ggp", "Gene"),
    ("org", "Organism"),
];

pub fn retype(entity_type: &str) -> &str {
    TYPE_MAP
        .iter()
        .find(|(short, _)| *short == entity_type)
        .map_or(entity_type, |(_, long)| *long)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn parse(offset: &str) -> Result<Self, FormatError> {
        let (start, end) = offset
            .split_once('-')
            .ok_or_else(|| FormatError::BadOffset(offset.to_string()))?;
        let start = start
            .trim()
            .parse()
            .map_err(|_| FormatError::BadOffset(offset.to_string()))?;
        let end = end
            .trim()
            .parse()
            .map_err(|_| FormatError::BadOffset(offset.to_string()))?;
        if start > end {
            return Err(FormatError::ReversedOffset(offset.to_string()));
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub entity_type: String,
    pub span: Span,
    pub text: String,
    pub uid: String,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub id: String,
    pub span: Span,
    pub text: String,
    pub uid: String,
}

#[derive(Debug, Clone)]
pub struct Dependency {
    pub id: String,
    pub dep_type: String,
    pub t1: String,
    pub t2: String,
    pub uid: String,
}

#[derive(Debug, Clone)]
pub struct Sentence {
    pub id: String,
    pub text: String,
    pub span: Span,
    pub entities: Vec<Entity>,
    pub tokens: Vec<Token>,
    // Phrases are never written, but each one still takes a T number.
    pub phrase_count: usize,
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub orig_id: String,
    pub text: String,
    pub sentences: Vec<Sentence>,
}

// Which annotation layers end up in the .ann output.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnOptions {
    pub retype: bool,
    pub no_tokens: bool,
    pub no_deps: bool,
}

// Attributes the TEES schema mandates even though the standoff output ignores them.
fn require(element: &Element, attributes: &[&'static str]) -> Result<(), FormatError> {
    for attribute in attributes {
        attr(element, *attribute)?;
    }
    Ok(())
}

fn attr(element: &Element, attribute: &'static str) -> Result<String, FormatError> {
    element
        .attr(attribute)
        .map(str::to_string)
        .ok_or_else(|| FormatError::MissingAttribute {
            element: element.name.clone(),
            attribute,
        })
}

impl Document {
    pub fn from_xml(element: &Element) -> Result<Self> {
        let id = attr(element, "id")?;
        let orig_id = attr(element, "origId")?;
        let text = attr(element, "text")?;
        let sentences = element
            .children_named("sentence")
            .map(Sentence::from_xml)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in document {id}"))?;

        let mut document = Self {
            orig_id,
            text,
            sentences,
        };
        document.assign_uids();
        Ok(document)
    }

    // TEES ids repeat across sentences; replace them with document-unique T/R numbering.
    fn assign_uids(&mut self) {
        let mut next_t = 1_usize;
        let mut next_r = 1_usize;
        let mut take_t = || {
            let uid = format!("T{next_t}");
            next_t += 1;
            uid
        };
        for sentence in &mut self.sentences {
            for token in &mut sentence.tokens {
                token.uid = take_t();
            }
            for _ in 0..sentence.phrase_count {
                take_t();
            }
            for entity in &mut sentence.entities {
                entity.uid = take_t();
            }
            for dependency in &mut sentence.dependencies {
                dependency.uid = format!("R{next_r}");
                next_r += 1;
            }
        }
    }
}

impl Sentence {
    pub fn from_xml(element: &Element) -> Result<Self> {
        let id = attr(element, "id")?;
        Self::build(element, id.clone()).with_context(|| format!("in sentence {id}"))
    }

    fn build(element: &Element, id: String) -> Result<Self> {
        let text = attr(element, "text")?;
        let span = Span::parse(&attr(element, "charOffset")?)?;

        let entities = element
            .children_named("evex_entity")
            .map(Entity::from_xml)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tokens = Vec::new();
        let mut phrase_count = 0_usize;
        let mut dependencies = Vec::new();
        for analyses in element.children_named("analyses") {
            for tokenization in analyses.children_named("tokenization") {
                for token in tokenization.children_named("token") {
                    tokens.push(Token::from_xml(token)?);
                }
            }
            for parse in analyses.children_named("parse") {
                for dependency in parse.children_named("dependency") {
                    dependencies.push(Dependency::from_xml(dependency)?);
                }
                for phrase in parse.children_named("phrase") {
                    check_phrase(phrase)?;
                    phrase_count += 1;
                }
            }
        }

        Ok(Self {
            id,
            text,
            span,
            entities,
            tokens,
            phrase_count,
            dependencies,
        })
    }

    // Render this sentence's annotations with offsets shifted by `base_offset`.
    pub fn write_annotations(
        &self,
        out: &mut String,
        base_offset: usize,
        options: AnnOptions,
    ) -> Result<(), FormatError> {
        for entity in &self.entities {
            let entity_type = if options.retype {
                retype(&entity.entity_type)
            } else {
                entity.entity_type.as_str()
            };
            push_span_line(out, &entity.uid, entity_type, entity.span, base_offset, &entity.text);
        }
        if options.no_tokens {
            return Ok(());
        }
        for token in &self.tokens {
            push_span_line(out, &token.uid, "Token", token.span, base_offset, &token.text);
        }
        if options.no_deps {
            return Ok(());
        }

        let token_uids: HashMap<&str, &str> = self
            .tokens
            .iter()
            .map(|token| (token.id.as_str(), token.uid.as_str()))
            .collect();
        for dependency in &self.dependencies {
            let arg1 = lookup_token(&token_uids, dependency, &dependency.t1)?;
            let arg2 = lookup_token(&token_uids, dependency, &dependency.t2)?;
            out.push_str(&format!(
                "{}\t{} Arg1:{} Arg2:{}\n",
                dependency.uid, dependency.dep_type, arg1, arg2
            ));
        }
        Ok(())
    }
}

fn lookup_token<'a>(
    token_uids: &HashMap<&str, &'a str>,
    dependency: &Dependency,
    token: &str,
) -> Result<&'a str, FormatError> {
    token_uids
        .get(token)
        .copied()
        .ok_or_else(|| FormatError::UnknownToken {
            dependency: dependency.id.clone(),
            token: token.to_string(),
        })
}

fn push_span_line(out: &mut String, uid: &str, kind: &str, span: Span, base: usize, text: &str) {
    out.push_str(&format!(
        "{uid}\t{kind} {} {}\t{text}\n",
        span.start + base,
        span.end + base
    ));
}

impl Entity {
    fn from_xml(element: &Element) -> Result<Self, FormatError> {
        require(element, &["id", "origId"])?;
        Ok(Self {
            entity_type: attr(element, "entity_type")?,
            span: Span::parse(&attr(element, "charOffset")?)?,
            text: attr(element, "text")?,
            uid: String::new(),
        })
    }
}

impl Token {
    fn from_xml(element: &Element) -> Result<Self, FormatError> {
        require(element, &["POS"])?;
        Ok(Self {
            id: attr(element, "id")?,
            span: Span::parse(&attr(element, "charOffset")?)?,
            text: attr(element, "text")?,
            uid: String::new(),
        })
    }
}

fn check_phrase(element: &Element) -> Result<(), FormatError> {
    require(element, &["id", "type"])?;
    Span::parse(&attr(element, "charOffset")?)?;
    Ok(())
}

impl Dependency {
    fn from_xml(element: &Element) -> Result<Self, FormatError> {
        Ok(Self {
            id: attr(element, "id")?,
            dep_type: attr(element, "type")?,
            t1: attr(element, "t1")?,
            t2: attr(element, "t2")?,
            uid: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::xml::DocumentReader;

    const SAMPLE: &str = r#"<corpus>
  <document id="d0" origId="123" text="Aspirin helps. It cures pain.">
    <sentence id="d0.s0" text="Aspirin helps." charOffset="0-14">
      <evex_entity id="d0.s0.e0" entity_type="che" charOffset="0-7" text="Aspirin" origId="e1"/>
      <analyses>
        <tokenization>
          <token id="t1" POS="NN" charOffset="0-7" text="Aspirin" headScore="1"/>
          <token id="t2" POS="VBZ" charOffset="8-13" text="helps"/>
        </tokenization>
        <parse>
          <dependency id="d1" t1="t2" t2="t1" type="nsubj"/>
          <phrase id="p1" type="NP" charOffset="0-7"/>
        </parse>
      </analyses>
    </sentence>
    <sentence id="d0.s1" text="It cures pain." charOffset="15-29">
      <evex_entity id="d0.s1.e0" entity_type="dis" charOffset="9-13" text="pain" origId="e2"/>
      <analyses>
        <tokenization>
          <token id="t1" POS="PRP" charOffset="0-2" text="It"/>
        </tokenization>
      </analyses>
    </sentence>
  </document>
</corpus>"#;

    fn sample_document() -> Document {
        let mut reader = DocumentReader::new(SAMPLE.as_bytes());
        let element = reader.next_document().unwrap().unwrap();
        Document::from_xml(&element).unwrap()
    }

    #[test]
    fn uids_follow_token_phrase_entity_order_per_document() {
        let doc = sample_document();
        let s0 = &doc.sentences[0];
        assert_eq!(s0.tokens[0].uid, "T1");
        assert_eq!(s0.tokens[1].uid, "T2");
        assert_eq!(s0.phrase_count, 1);
        assert_eq!(s0.entities[0].uid, "T4");
        assert_eq!(s0.dependencies[0].uid, "R1");

        let s1 = &doc.sentences[1];
        assert_eq!(s1.tokens[0].uid, "T5");
        assert_eq!(s1.entities[0].uid, "T6");
    }

    #[test]
    fn ignored_attributes_are_still_required() {
        let xml = r#"<document id="d" origId="1" text="x">
            <sentence id="s" text="x" charOffset="0-1">
              <analyses><tokenization><token id="t1" charOffset="0-1" text="x"/></tokenization></analyses>
            </sentence>
          </document>"#;
        let element = DocumentReader::new(xml.as_bytes())
            .next_document()
            .unwrap()
            .unwrap();
        let err = Document::from_xml(&element).unwrap_err();
        assert!(format!("{err:#}").contains("`POS`"), "{err:#}");
    }

    #[test]
    fn annotations_render_entities_tokens_and_dependencies() {
        let doc = sample_document();
        let mut out = String::new();
        doc.sentences[0]
            .write_annotations(&mut out, 0, AnnOptions::default())
            .unwrap();
        assert_eq!(
            out,
            "T4\tche 0 7\tAspirin\n\
             T1\tToken 0 7\tAspirin\n\
             T2\tToken 8 13\thelps\n\
             R1\tnsubj Arg1:T2 Arg2:T1\n"
        );
    }

    #[test]
    fn base_offset_and_retype_apply_to_entities() {
        let doc = sample_document();
        let mut out = String::new();
        let options = AnnOptions {
            retype: true,
            no_tokens: true,
            no_deps: false,
        };
        doc.sentences[1]
            .write_annotations(&mut out, 15, options)
            .unwrap();
        assert_eq!(out, "T6\tDisease 24 28\tpain\n");
    }

    #[test]
    fn no_deps_keeps_tokens() {
        let doc = sample_document();
        let mut out = String::new();
        let options = AnnOptions {
            retype: false,
            no_tokens: false,
            no_deps: true,
        };
        doc.sentences[0]
            .write_annotations(&mut out, 0, options)
            .unwrap();
        assert_eq!(out.lines().count(), 3);
        assert!(!out.contains("nsubj"));
    }

    #[test]
    fn retype_leaves_unknown_types_alone() {
        assert_eq!(retype("ggp"), "Gene");
        assert_eq!(retype("Protein"), "Protein");
    }

    #[test]
    fn span_parse_rejects_bad_offsets() {
        assert_eq!(Span::parse("3-9").unwrap(), Span { start: 3, end: 9 });
        assert!(matches!(Span::parse("39"), Err(FormatError::BadOffset(_))));
        assert!(matches!(
            Span::parse("9-3"),
            Err(FormatError::ReversedOffset(_))
        ));
    }

    #[test]
    fn format_errors_name_the_sentence_and_document() {
        let xml = r#"<document id="d7" origId="7" text="x">
            <sentence id="d7.s0" text="x" charOffset="0-1">
              <evex_entity id="e" entity_type="che" charOffset="0-1" text="x"/>
            </sentence>
          </document>"#;
        let element = DocumentReader::new(xml.as_bytes())
            .next_document()
            .unwrap()
            .unwrap();
        let err = Document::from_xml(&element).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("in document d7"), "{chain}");
        assert!(chain.contains("in sentence d7.s0"), "{chain}");
        assert!(chain.contains("origId"), "{chain}");
    }

    #[test]
    fn dangling_dependency_token_is_an_error() {
        let xml = r#"<document id="d" origId="1" text="x">
            <sentence id="s" text="x" charOffset="0-1">
              <analyses><parse><dependency id="dep" t1="t9" t2="t9" type="dep"/></parse></analyses>
            </sentence>
          </document>"#;
        let element = DocumentReader::new(xml.as_bytes())
            .next_document()
            .unwrap()
            .unwrap();
        let doc = Document::from_xml(&element).unwrap();
        let mut out = String::new();
        let err = doc.sentences[0]
            .write_annotations(&mut out, 0, AnnOptions::default())
            .unwrap_err();
        assert!(matches!(err, FormatError::UnknownToken { .. }));
    }
}
