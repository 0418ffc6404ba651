//! Parametric select queries (§4.8, §6): the `IF_MATCH_TYPES` combinator
//! grid.
//!
//! Grounded on `examples/original_source/egppy/egppy/gene_pool/queries.py`:
//! each entry names how a candidate row's input/output type arrays must
//! relate to the caller's wanted `(input_types, output_types)`, from an
//! exact positional match down to "any will do". The five relational
//! strictness levels map onto PostgreSQL's array operators (`=`, `<@`,
//! `&&`, `@>`) exactly as the original names them; only the SQL templating
//! mechanism changes (Rust `format!` over literal column names plus `$n`
//! bind placeholders, rather than Python `str.format` over named slots).

use crate::error::{Result, StoreError};

/// One column's match strictness (`queries.py`'s `E/T/B/S/O/A` key letters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    /// Exact: the same sorted type set *and* the same index assignment.
    Exact,
    /// Type: the same sorted type set, any index assignment.
    Type,
    /// Subset: the candidate's types are a subset of the wanted set (`<@`).
    Subset,
    /// Superset: the candidate's types are a superset of the wanted set (`@>`).
    Superset,
    /// Overlap: the candidate shares at least one type with the wanted set (`&&`).
    Overlap,
    /// Any: no constraint on this side.
    Any,
}

impl TypeMatch {
    fn code(self) -> char {
        match self {
            TypeMatch::Exact => 'E',
            TypeMatch::Type => 'T',
            TypeMatch::Subset => 'B',
            TypeMatch::Superset => 'S',
            TypeMatch::Overlap => 'O',
            TypeMatch::Any => 'A',
        }
    }

    fn from_code(c: char) -> Option<Self> {
        Some(match c {
            'E' => TypeMatch::Exact,
            'T' => TypeMatch::Type,
            'B' => TypeMatch::Subset,
            'S' => TypeMatch::Superset,
            'O' => TypeMatch::Overlap,
            'A' => TypeMatch::Any,
            _ => return None,
        })
    }
}

/// A full interface-match specification (one `IxOx` key, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceMatch {
    pub input: TypeMatch,
    pub output: TypeMatch,
}

impl InterfaceMatch {
    pub fn new(input: TypeMatch, output: TypeMatch) -> Self {
        InterfaceMatch { input, output }
    }

    /// The dict key this combination corresponds to in the original
    /// (`"IEOE"`..`"IAOA"`), kept for debugging/logging parity.
    pub fn key(&self) -> String {
        format!("I{}O{}", self.input.code(), self.output.code())
    }

    fn side(m: TypeMatch, types_col: &str, types_param: &str, idx_col: &str, idx_param: &str) -> Option<String> {
        match m {
            TypeMatch::Any => None,
            TypeMatch::Overlap => Some(format!("{types_col} && {types_param}")),
            TypeMatch::Subset => Some(format!("{types_col} <@ {types_param}")),
            TypeMatch::Superset => Some(format!("{types_col} @> {types_param}")),
            TypeMatch::Type => Some(format!("{types_col} = {types_param}")),
            TypeMatch::Exact => {
                Some(format!("{types_col} = {types_param} AND {idx_col} = {idx_param}"))
            }
        }
    }

    /// Builds the `WHERE` clause body for this combination (without the
    /// leading `WHERE` keyword or the steady-state exclusion/limit suffix,
    /// both added by [`crate::table::PgGeneTable::select`]).
    ///
    /// `$1`/`$2` bind the candidate's wanted `input_types`/`output_types`
    /// arrays; `$3`/`$4` bind the wanted `inputs`/`outputs` index bytes
    /// (referenced only when the corresponding side is [`TypeMatch::Exact`]).
    pub fn where_body(&self) -> String {
        let input_clause = Self::side(self.input, "input_types", "$1::INT[]", "inputs", "$3");
        let output_clause = Self::side(self.output, "output_types", "$2::INT[]", "outputs", "$4");
        match (input_clause, output_clause) {
            (Some(i), Some(o)) => format!("{i} AND {o}"),
            (Some(i), None) => i,
            (None, Some(o)) => o,
            (None, None) => "TRUE".to_string(),
        }
    }
}

/// Every `(input, output)` combination `queries.py` enumerates (§6), in the
/// same `E, T, B, S, O, A` order as the original dict — 36 entries.
pub fn all_match_combinations() -> Vec<InterfaceMatch> {
    const ORDER: [TypeMatch; 6] = [
        TypeMatch::Exact,
        TypeMatch::Type,
        TypeMatch::Subset,
        TypeMatch::Superset,
        TypeMatch::Overlap,
        TypeMatch::Any,
    ];
    let mut combos = Vec::with_capacity(36);
    for &input in &ORDER {
        for &output in &ORDER {
            combos.push(InterfaceMatch::new(input, output));
        }
    }
    combos
}

/// Parses an `IxOx` key back into an [`InterfaceMatch`], the inverse of
/// [`InterfaceMatch::key`].
pub fn parse_key(key: &str) -> Result<InterfaceMatch> {
    let bytes = key.as_bytes();
    if bytes.len() != 4 || bytes[0] != b'I' || bytes[2] != b'O' {
        return Err(StoreError::Query(format!("malformed match key {key:?}")));
    }
    let input = TypeMatch::from_code(bytes[1] as char)
        .ok_or_else(|| StoreError::Query(format!("unknown match code in key {key:?}")))?;
    let output = TypeMatch::from_code(bytes[3] as char)
        .ok_or_else(|| StoreError::Query(format!("unknown match code in key {key:?}")))?;
    Ok(InterfaceMatch::new(input, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_six_combinations_are_generated() {
        assert_eq!(all_match_combinations().len(), 36);
    }

    #[test]
    fn key_round_trips() {
        for combo in all_match_combinations() {
            let key = combo.key();
            assert_eq!(parse_key(&key).unwrap(), combo);
        }
    }

    #[test]
    fn exact_exact_matches_indices_on_both_sides() {
        let combo = InterfaceMatch::new(TypeMatch::Exact, TypeMatch::Exact);
        assert_eq!(combo.key(), "IEOE");
        let where_body = combo.where_body();
        assert!(where_body.contains("input_types = $1::INT[]"));
        assert!(where_body.contains("inputs = $3"));
        assert!(where_body.contains("output_types = $2::INT[]"));
        assert!(where_body.contains("outputs = $4"));
    }

    #[test]
    fn any_any_has_no_constraint() {
        let combo = InterfaceMatch::new(TypeMatch::Any, TypeMatch::Any);
        assert_eq!(combo.key(), "IAOA");
        assert_eq!(combo.where_body(), "TRUE");
    }

    #[test]
    fn overlap_uses_postgres_array_overlap_operator() {
        let combo = InterfaceMatch::new(TypeMatch::Overlap, TypeMatch::Any);
        assert_eq!(combo.where_body(), "input_types && $1::INT[]");
    }

    #[test]
    fn rejects_malformed_key() {
        assert!(parse_key("XEOE").is_err());
        assert!(parse_key("IE0E").is_err());
    }
}
