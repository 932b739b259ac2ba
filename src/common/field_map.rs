// src/common/field_map.rs

/// Esquema declarativo de nomes de campo de uma entidade: camelCase (API) <-> snake_case (banco).
///
/// A serialização das structs já é feita pelo serde (`rename_all = "camelCase"`) e pelo
/// `FromRow`; este mapa cobre o que chega como *texto* na API (ordenação, filtros) e
/// funciona como allowlist antes de qualquer nome de coluna entrar no SQL.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    entity: &'static str,
    fields: &'static [(&'static str, &'static str)],
    default_sort: &'static str,
}

impl FieldMap {
    pub const fn new(
        entity: &'static str,
        fields: &'static [(&'static str, &'static str)],
        default_sort: &'static str,
    ) -> Self {
        Self { entity, fields, default_sort }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn default_sort(&self) -> &'static str {
        self.default_sort
    }

    /// camelCase -> coluna
    pub fn column(&self, field: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|(api, _)| *api == field)
            .map(|(_, column)| *column)
    }
}

pub fn to_camel_case(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut upper_next = false;
    for ch in column.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{chat, education, health, ouvidoria, requests};

    const ALL: &[FieldMap] = &[
        requests::REQUEST_FIELDS,
        chat::CONVERSATION_FIELDS,
        education::STUDENT_FIELDS,
        education::TEACHER_FIELDS,
        education::ENROLLMENT_FIELDS,
        education::DIET_FIELDS,
        education::MENU_FIELDS,
        education::FEEDBACK_FIELDS,
        ouvidoria::CASE_FIELDS,
        health::TFD_FIELDS,
        health::PROGRAM_FIELDS,
    ];

    #[test]
    fn snake_to_camel() {
        assert_eq!(to_camel_case("target_department"), "targetDepartment");
        assert_eq!(to_camel_case("school_year"), "schoolYear");
        assert_eq!(to_camel_case("id"), "id");
    }

    #[test]
    fn every_map_resolves_its_fields_and_default_sort() {
        for map in ALL {
            for (api, column) in map.fields {
                assert_eq!(map.column(api), Some(*column), "{}", map.entity());
            }
            assert!(
                map.fields.iter().any(|(_, column)| *column == map.default_sort()),
                "{} default sort is not mapped",
                map.entity()
            );
        }
    }

    #[test]
    fn conventional_names_follow_the_case_rules() {
        // Exceções explícitas: nomes de API que não derivam da coluna
        let renamed = ["type", "timestamp", "year"];
        for map in ALL {
            for (api, column) in map.fields {
                if renamed.contains(api) {
                    continue;
                }
                assert_eq!(to_camel_case(column), *api, "{}.{}", map.entity(), api);
            }
        }
    }
}
