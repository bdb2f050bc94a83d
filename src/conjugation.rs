//! Verb paradigm tables.
//!
//! The conjugation section of a page holds up to eleven tables. Each cell is
//! addressed by `(table, row, column)` and [`SLOTS`] says which mood, tense
//! and person a coordinate holds. Rows omit their empty leading cells, so the
//! column of a given person shifts from row to row.

use crate::error::{Result, StructuralError};
use crate::node::{self, ParsedNode};
use log::trace;
use once_cell::sync::Lazy;
use scraper::ElementRef;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

const SECTION_ID_PREFIX: &str = "conjugacion";
const MAX_TABLES: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonPersonal {
    Infinitivo,
    Gerundio,
    Participio,
}

impl NonPersonal {
    pub const ALL: [NonPersonal; 3] = [
        NonPersonal::Infinitivo,
        NonPersonal::Gerundio,
        NonPersonal::Participio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NonPersonal::Infinitivo => "Infinitivo",
            NonPersonal::Gerundio => "Gerundio",
            NonPersonal::Participio => "Participio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    Indicativo,
    Subjuntivo,
    Imperativo,
}

impl Mood {
    pub const ALL: [Mood; 3] = [Mood::Indicativo, Mood::Subjuntivo, Mood::Imperativo];

    pub fn label(self) -> &'static str {
        match self {
            Mood::Indicativo => "Indicativo",
            Mood::Subjuntivo => "Subjuntivo",
            Mood::Imperativo => "Imperativo",
        }
    }

    /// Tenses the mood is declared with, simple forms before their compound pair.
    pub fn tenses(self) -> &'static [Tense] {
        match self {
            Mood::Indicativo => &[
                Tense::Presente,
                Tense::Antepresente,
                Tense::Copreterito,
                Tense::Antecopreterito,
                Tense::Preterito,
                Tense::Antepreterito,
                Tense::Futuro,
                Tense::Antefuturo,
                Tense::Pospreterito,
                Tense::Antepospreterito,
            ],
            Mood::Subjuntivo => &[
                Tense::Presente,
                Tense::Antepresente,
                Tense::Preterito,
                Tense::Antepreterito,
                Tense::Futuro,
                Tense::Antefuturo,
            ],
            Mood::Imperativo => &[Tense::Imperativo],
        }
    }
}

/// Tense names follow Andrés Bello's terminology, as the dictionary does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tense {
    Presente,
    Antepresente,
    Copreterito,
    Antecopreterito,
    Preterito,
    Antepreterito,
    Futuro,
    Antefuturo,
    Pospreterito,
    Antepospreterito,
    Imperativo,
}

impl Tense {
    pub fn label(self) -> &'static str {
        match self {
            Tense::Presente => "Presente",
            Tense::Antepresente => "Antepresente",
            Tense::Copreterito => "Copretérito",
            Tense::Antecopreterito => "Antecopretérito",
            Tense::Preterito => "Pretérito",
            Tense::Antepreterito => "Antepretérito",
            Tense::Futuro => "Futuro",
            Tense::Antefuturo => "Antefuturo",
            Tense::Pospreterito => "Pospretérito",
            Tense::Antepospreterito => "Antepospretérito",
            Tense::Imperativo => "Imperativo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Person {
    Yo,
    TuVos,
    Usted,
    El,
    Nosotros,
    Vosotros,
    Ustedes,
    Ellos,
}

impl Person {
    pub const ALL: [Person; 8] = [
        Person::Yo,
        Person::TuVos,
        Person::Usted,
        Person::El,
        Person::Nosotros,
        Person::Vosotros,
        Person::Ustedes,
        Person::Ellos,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Person::Yo => "yo",
            Person::TuVos => "tú / vos",
            Person::Usted => "usted",
            Person::El => "él",
            Person::Nosotros => "nosotros",
            Person::Vosotros => "vosotros",
            Person::Ustedes => "ustedes",
            Person::Ellos => "ellos",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    NonPersonal(NonPersonal),
    Personal(Mood, Tense, Person),
}

/// Column of the simple tense for each person row (rows 1 to 8). The
/// compound tense, when the table has one, sits one column to the right.
const PERSON_COLUMNS: [(Person, usize); 8] = [
    (Person::Yo, 3),
    (Person::TuVos, 2),
    (Person::Usted, 1),
    (Person::El, 2),
    (Person::Nosotros, 3),
    (Person::Vosotros, 2),
    (Person::Ustedes, 1),
    (Person::Ellos, 2),
];

/// Personal-form tables: index, mood, simple tense and compound tense.
const PERSONAL_TABLES: [(usize, Mood, Tense, Option<Tense>); 9] = [
    (1, Mood::Indicativo, Tense::Presente, Some(Tense::Antepresente)),
    (2, Mood::Indicativo, Tense::Copreterito, Some(Tense::Antecopreterito)),
    (3, Mood::Indicativo, Tense::Preterito, Some(Tense::Antepreterito)),
    (4, Mood::Indicativo, Tense::Futuro, Some(Tense::Antefuturo)),
    (5, Mood::Indicativo, Tense::Pospreterito, Some(Tense::Antepospreterito)),
    (6, Mood::Subjuntivo, Tense::Presente, Some(Tense::Antepresente)),
    (7, Mood::Subjuntivo, Tense::Preterito, None),
    (8, Mood::Subjuntivo, Tense::Antepreterito, None),
    (9, Mood::Subjuntivo, Tense::Futuro, Some(Tense::Antefuturo)),
];

const IMPERATIVE_CELLS: [((usize, usize, usize), Person); 4] = [
    ((10, 1, 3), Person::TuVos),
    ((10, 2, 1), Person::Usted),
    ((10, 3, 3), Person::Vosotros),
    ((10, 4, 1), Person::Ustedes),
];

/// Coordinate to paradigm slot. Coordinates not listed here carry nothing
/// of interest (labels, compound non-personal forms) and are skipped.
pub static SLOTS: Lazy<HashMap<(usize, usize, usize), Slot>> = Lazy::new(|| {
    let mut slots = HashMap::new();
    slots.insert((0, 1, 0), Slot::NonPersonal(NonPersonal::Infinitivo));
    slots.insert((0, 1, 1), Slot::NonPersonal(NonPersonal::Gerundio));
    slots.insert((0, 5, 0), Slot::NonPersonal(NonPersonal::Participio));

    for (table, mood, simple, compound) in PERSONAL_TABLES {
        for (row, (person, column)) in PERSON_COLUMNS.iter().enumerate() {
            let row = row + 1;
            slots.insert((table, row, *column), Slot::Personal(mood, simple, *person));
            if let Some(compound) = compound {
                slots.insert(
                    (table, row, column + 1),
                    Slot::Personal(mood, compound, *person),
                );
            }
        }
    }

    for (coordinate, person) in IMPERATIVE_CELLS {
        slots.insert(
            coordinate,
            Slot::Personal(Mood::Imperativo, Tense::Imperativo, person),
        );
    }
    slots
});

/// Full set of inflected forms of one verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conjugation {
    html: String,
    id: String,
    verb: String,
    forms: HashMap<Slot, String>,
}

impl Conjugation {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = node::fragment(html)?;
        let mut conjugation = Self::from_element(node::first_element(&dom)?)?;
        conjugation.html = html.to_string();
        Ok(conjugation)
    }

    pub fn try_from_html(html: &str) -> Option<Self> {
        Self::from_html(html).ok()
    }

    /// Reads the first `<section>` at or below `root`, whose id must start
    /// with `conjugacion`.
    pub fn from_element(root: ElementRef<'_>) -> Result<Self> {
        let section = node::find_first(root, "section")
            .filter(|s| {
                s.value()
                    .id()
                    .is_some_and(|id| id.starts_with(SECTION_ID_PREFIX))
            })
            .ok_or(StructuralError::NotAConjugationSection)?;
        let id = section.value().id().unwrap_or_default().to_string();

        let verb = node::find_first(section, "header")
            .and_then(|header| node::find_first(header, "h2"))
            .map(|h2| {
                node::text_of(h2)
                    .replace("Conjugación de «", "")
                    .replace('»', "")
                    .trim()
                    .to_string()
            })
            .unwrap_or_default();

        let mut forms = HashMap::new();
        let tables = node::elements_within(section)
            .filter(|e| e.value().name() == "table")
            .take(MAX_TABLES);
        for (table_index, table) in tables.enumerate() {
            let rows = node::elements_within(table).filter(|e| e.value().name() == "tr");
            for (row_index, row) in rows.enumerate() {
                for (column_index, cell) in node::element_children(row).enumerate() {
                    let coordinate = (table_index, row_index, column_index);
                    match SLOTS.get(&coordinate) {
                        Some(slot) => {
                            forms.insert(*slot, node::text_of(cell).trim().to_string());
                        }
                        None => trace!("No paradigm slot at {:?}", coordinate),
                    }
                }
            }
        }

        Ok(Conjugation {
            html: root.html(),
            id,
            verb,
            forms,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The verb in infinitive, as given by the section header.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn form(&self, mood: Mood, tense: Tense, person: Person) -> Option<&str> {
        self.forms
            .get(&Slot::Personal(mood, tense, person))
            .map(String::as_str)
    }

    /// Infinitive, gerund or participle; empty when the table lacks it.
    pub fn non_personal(&self, form: NonPersonal) -> &str {
        self.forms
            .get(&Slot::NonPersonal(form))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// The paradigm as nested mappings: mood, tense, person. Every declared
    /// tense is present even when no form filled it.
    pub fn paradigm(&self) -> Value {
        let mut paradigm = Map::new();

        let non_personal: Map<String, Value> = NonPersonal::ALL
            .iter()
            .map(|form| (form.label().to_string(), Value::from(self.non_personal(*form))))
            .collect();
        paradigm.insert(
            "Formas no personales".to_string(),
            Value::Object(non_personal),
        );

        for mood in Mood::ALL {
            let mut tenses = Map::new();
            for tense in mood.tenses() {
                let persons: Map<String, Value> = Person::ALL
                    .iter()
                    .filter_map(|person| {
                        self.form(mood, *tense, *person)
                            .map(|form| (person.label().to_string(), Value::from(form)))
                    })
                    .collect();
                tenses.insert(tense.label().to_string(), Value::Object(persons));
            }
            paradigm.insert(mood.label().to_string(), Value::Object(tenses));
        }
        Value::Object(paradigm)
    }
}

impl ParsedNode for Conjugation {
    fn html(&self) -> &str {
        &self.html
    }

    fn set_html(&mut self, html: &str) -> Result<()> {
        *self = Self::from_html(html)?;
        Ok(())
    }

    fn to_dict(&self, extended: bool) -> Value {
        let mut dict = node::base_dict(&self.html, extended);
        if extended {
            dict.insert("id".to_string(), Value::from(self.id.as_str()));
        }
        dict.insert("verb".to_string(), Value::from(self.verb.as_str()));
        dict.insert("conjugations".to_string(), self.paradigm());
        Value::Object(dict)
    }
}

impl fmt::Display for Conjugation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.paradigm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DleError;

    fn section(tables: &[&str]) -> String {
        format!(
            r#"<section id="conjugacionHBbyaJC"><header><h2>Conjugación de «hablar»</h2></header>{}</section>"#,
            tables.join("")
        )
    }

    const EMPTY_TABLE: &str = "<table><tr><th>-</th></tr></table>";

    const NON_PERSONAL: &str = concat!(
        "<table>",
        "<tr><th>Infinitivo</th><th>Gerundio</th></tr>",
        "<tr><td>hablar</td><td>hablando</td></tr>",
        "<tr><th>Infinitivo compuesto</th><th>Gerundio compuesto</th></tr>",
        "<tr><td>haber hablado</td><td>habiendo hablado</td></tr>",
        "<tr><th>Participio</th></tr>",
        "<tr><td>hablado</td></tr>",
        "</table>"
    );

    const PRESENT: &str = concat!(
        "<table>",
        "<tr><th>Número</th><th>Personas del discurso</th><th>Pronombres personales</th><th>Presente</th><th>Antepresente</th></tr>",
        "<tr><th>Singular</th><th>Primera</th><th>yo</th><td>hablo</td><td>he hablado</td></tr>",
        "<tr><th>Segunda</th><th>tú / vos</th><td>hablas / hablás</td><td>has hablado</td></tr>",
        "<tr><th>usted</th><td>habla</td><td>ha hablado</td></tr>",
        "<tr><th>Tercera</th><th>él, ella</th><td>habla</td><td>ha hablado</td></tr>",
        "</table>"
    );

    #[test]
    fn test_slot_table_is_keyed_by_coordinates() {
        assert_eq!(
            SLOTS.get(&(1, 1, 3)),
            Some(&Slot::Personal(Mood::Indicativo, Tense::Presente, Person::Yo))
        );
        assert_eq!(
            SLOTS.get(&(1, 1, 4)),
            Some(&Slot::Personal(Mood::Indicativo, Tense::Antepresente, Person::Yo))
        );
        assert_eq!(
            SLOTS.get(&(8, 7, 1)),
            Some(&Slot::Personal(Mood::Subjuntivo, Tense::Antepreterito, Person::Ustedes))
        );
        assert_eq!(SLOTS.get(&(7, 1, 4)), None);
        assert_eq!(SLOTS.get(&(1, 1, 0)), None);
        // 3 non-personal, 7 paired tables of 16 cells, 2 single tables of 8, 4 imperative.
        assert_eq!(SLOTS.len(), 3 + 7 * 16 + 2 * 8 + 4);
    }

    #[test]
    fn test_parse_present_indicative() {
        let conjugation = Conjugation::from_html(&section(&[NON_PERSONAL, PRESENT])).unwrap();
        assert_eq!(conjugation.id(), "conjugacionHBbyaJC");
        assert_eq!(conjugation.verb(), "hablar");
        assert_eq!(conjugation.non_personal(NonPersonal::Infinitivo), "hablar");
        assert_eq!(conjugation.non_personal(NonPersonal::Gerundio), "hablando");
        assert_eq!(conjugation.non_personal(NonPersonal::Participio), "hablado");
        assert_eq!(
            conjugation.form(Mood::Indicativo, Tense::Presente, Person::Yo),
            Some("hablo")
        );
        assert_eq!(
            conjugation.form(Mood::Indicativo, Tense::Antepresente, Person::TuVos),
            Some("has hablado")
        );
        assert_eq!(
            conjugation.form(Mood::Indicativo, Tense::Presente, Person::El),
            Some("habla")
        );
        assert_eq!(
            conjugation.form(Mood::Indicativo, Tense::Presente, Person::Ellos),
            None
        );

        let dict = conjugation.to_dict(false);
        assert_eq!(dict["verb"], "hablar");
        assert_eq!(dict["conjugations"]["Indicativo"]["Presente"]["yo"], "hablo");
        assert_eq!(
            dict["conjugations"]["Formas no personales"]["Participio"],
            "hablado"
        );
        assert!(dict["conjugations"]["Subjuntivo"]["Antefuturo"]
            .as_object()
            .unwrap()
            .is_empty());
        assert!(dict["conjugations"]["Imperativo"]["Imperativo"].is_object());
    }

    #[test]
    fn test_unmapped_coordinates_are_ignored() {
        let table = "<table><tr><th>x</th></tr><tr><td>hablo</td></tr></table>";
        let conjugation = Conjugation::from_html(&section(&[EMPTY_TABLE, table])).unwrap();
        assert!(conjugation.forms.is_empty());
        assert_eq!(conjugation.non_personal(NonPersonal::Infinitivo), "");
    }

    #[test]
    fn test_imperative_cells() {
        let imperative = concat!(
            "<table>",
            "<tr><th>Imperativo</th></tr>",
            "<tr><th>Segunda</th><th>Singular</th><th>tú / vos</th><td>habla / hablá</td></tr>",
            "<tr><th>usted</th><td>hable</td></tr>",
            "<tr><th>Plural</th><th>Segunda</th><th>vosotros</th><td>hablad</td></tr>",
            "<tr><th>ustedes</th><td>hablen</td></tr>",
            "</table>"
        );
        let mut tables = vec![EMPTY_TABLE; 10];
        tables.push(imperative);
        let conjugation = Conjugation::from_html(&section(&tables)).unwrap();
        assert_eq!(
            conjugation.form(Mood::Imperativo, Tense::Imperativo, Person::Vosotros),
            Some("hablad")
        );
        assert_eq!(
            conjugation.form(Mood::Imperativo, Tense::Imperativo, Person::Ustedes),
            Some("hablen")
        );
    }

    #[test]
    fn test_not_a_conjugation_section() {
        let err = Conjugation::from_html(r#"<section id="sinonimos"><table></table></section>"#)
            .unwrap_err();
        assert!(matches!(
            err,
            DleError::Structural(StructuralError::NotAConjugationSection)
        ));
        assert!(Conjugation::try_from_html("<div><table></table></div>").is_none());
    }

    #[test]
    fn test_missing_header_leaves_verb_empty() {
        let html = format!(r#"<section id="conjugacion1">{}</section>"#, NON_PERSONAL);
        let conjugation = Conjugation::from_html(&html).unwrap();
        assert_eq!(conjugation.verb(), "");
        assert_eq!(conjugation.non_personal(NonPersonal::Gerundio), "hablando");
    }
}
