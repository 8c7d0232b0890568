//! Keyword tables consulted by the priority cascade and the warranty lookup.
//!
//! A plain entry matches a whole word or a whole phrase. An entry ending in `*` matches
//! any word that starts with the stem. Matching runs on lowercased text where every
//! non-alphanumeric character separates words.

/// Immediate hazard: forces `alta` whatever the category says.
pub const DANGER: &[&str] = &[
    "gas",
    "fuga de gas",
    "olor a gas",
    "fuego",
    "incendio*",
    "llamas",
    "sale llama",
    "salen llamas",
    "en llamas",
    "humo",
    "chispa*",
    "chispea*",
    "cortocircuito*",
    "corto circuito*",
    "electrocu*",
    "explosi*",
    "explot*",
];

pub const ELECTRICAL_CATEGORY: &[&str] = &["electric*", "eléctric*", "electricidad"];

pub const ELECTRICAL_HIGH: &[&str] = &[
    "cortocircuito*",
    "corto circuito*",
    "chispa*",
    "chispea*",
    "humo",
    "olor a quemado",
    "quemad*",
    "se quema*",
];

pub const WATER_CRITICAL: &[&str] = &[
    "inunda*",
    "anega*",
    "sin agua",
    "no hay agua",
    "no sale agua",
    "corte de agua",
    "aguas servidas",
    "alcantarillado",
    "devuelve*",
    "desborde*",
    "desborda*",
    "rebalse*",
    "rebalsa*",
];

pub const WATER_CATEGORY: &[&str] = &[
    "agua",
    "plomeria",
    "plomería",
    "gasfiteria",
    "gasfitería",
    "cañeria*",
    "cañería*",
    "alcantarillado",
];

pub const WATER_MINOR: &[&str] = &[
    "fuga*",
    "filtra*",
    "filtración",
    "filtracion",
    "gotea*",
    "goteo*",
    "escurr*",
    "desag*",
    "drenaje*",
    "tapad*",
];

pub const STRUCTURE_CATEGORY: &[&str] = &["estructura*", "estructural*"];

pub const STRUCTURE_TERMS: &[&str] = &[
    "techo*",
    "muro*",
    "pared*",
    "grieta*",
    "fisura*",
    "derrumb*",
    "colaps*",
];

pub const STRUCTURE_HIGH: &[&str] = &[
    "grieta*",
    "fisura*",
    "derrumb*",
    "colaps*",
    "hoyo*",
    "agujero*",
    "forado*",
    "caid*",
    "caíd*",
    "cayo",
    "cayó",
    "desplom*",
];

pub const SANITARY: &[&str] = &[
    "baño*",
    "bano*",
    "sanitari*",
    "inodoro*",
    "wc",
    "excusado*",
    "letrina*",
    "lavamanos",
    "ducha*",
];

pub const SANITARY_CRITICAL: &[&str] = &[
    "no funciona*",
    "no sirve*",
    "no hay",
    "no tiene",
    "sin",
    "ninguno",
    "rebalsa*",
    "rebalse*",
    "desborda*",
];

pub const COSMETIC: &[&str] = &[
    "pintura*",
    "pintar",
    "rayad*",
    "rayon*",
    "rayón",
    "mueble*",
    "bisagra*",
    "cerradura*",
    "chapa*",
    "puerta*",
    "ventana*",
    "manilla*",
];

pub const FINISHES_CATEGORY: &[&str] = &[
    "terminacion*",
    "terminación",
    "pintura*",
    "puerta*",
    "ventana*",
    "piso*",
    "revestimiento*",
];

/// Lowercased text with word separators normalized to single spaces and padded on both
/// ends, so phrase lookups never straddle a partial word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        let mut out = String::with_capacity(lowered.len() + 2);
        out.push(' ');
        let mut last_space = true;
        for ch in lowered.chars() {
            if ch.is_alphanumeric() {
                out.push(ch);
                last_space = false;
            } else if !last_space {
                out.push(' ');
                last_space = true;
            }
        }
        if !last_space {
            out.push(' ');
        }
        Self(out)
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn matches(&self, term: &str) -> bool {
        match term.strip_suffix('*') {
            Some(stem) => self.0.contains(&format!(" {stem}")),
            None => self.0.contains(&format!(" {term} ")),
        }
    }

    pub fn matches_any(&self, table: &[&str]) -> bool {
        table.iter().any(|term| self.matches(term))
    }
}
