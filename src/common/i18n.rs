// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

const DEFAULT_LANG: &str = "pt";

static FALLBACK_STORE: LazyLock<I18nStore> = LazyLock::new(I18nStore::new);

/// Mensagens traduzidas, indexadas por idioma e chave.
/// Placeholders posicionais: `{0}`, `{1}`...
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages = HashMap::new();
        messages.insert("pt", PT.iter().copied().collect());
        messages.insert("en", EN.iter().copied().collect());
        Self { messages }
    }

    pub fn fallback() -> &'static I18nStore {
        &FALLBACK_STORE
    }

    /// Busca a mensagem no idioma pedido, caindo para o português.
    pub fn lookup(&self, lang: &str, key: &str) -> Option<&'static str> {
        self.messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .copied()
    }

    pub fn translate(&self, lang: &str, key: &str, args: &[String]) -> String {
        let template = self.lookup(lang, key).unwrap_or(key);
        args.iter()
            .enumerate()
            .fold(template.to_string(), |acc, (i, arg)| {
                acc.replace(&format!("{{{}}}", i), arg)
            })
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

const PT: &[(&str, &str)] = &[
    ("error.validation", "Um ou mais campos são inválidos."),
    ("error.email_exists", "Este e-mail já está em uso."),
    ("error.invalid_credentials", "E-mail ou senha inválidos."),
    ("error.invalid_token", "Token de autenticação inválido ou ausente."),
    ("error.user_not_found", "Usuário não encontrado."),
    ("error.forbidden", "Você precisa da permissão '{0}' para realizar esta ação."),
    ("error.not_found", "{0} não encontrado(a)."),
    ("error.conflict", "{0} já cadastrado(a)."),
    ("error.invalid_transition", "Não é possível mudar o status de '{0}' para '{1}'."),
    ("error.forward_not_allowed", "Solicitações com status '{0}' não podem ser encaminhadas."),
    ("error.conversation_closed", "A conversa {0} está encerrada."),
    ("error.unknown_module", "Módulo '{0}' não existe."),
    ("error.duplicate_module", "O módulo '{0}' aparece mais de uma vez."),
    ("error.invalid_sort_field", "Não é possível ordenar por '{0}'."),
    ("error.invalid_upload", "Arquivo inválido: {0}."),
    ("error.internal", "Ocorreu um erro inesperado."),
    ("validation.required", "Campo obrigatório."),
    ("validation.invalid_email", "E-mail inválido."),
    ("validation.min_6_chars", "Deve ter no mínimo 6 caracteres."),
    ("validation.min_10_chars", "Deve ter no mínimo 10 caracteres."),
    ("validation.max_length", "Texto muito longo."),
    ("validation.invalid_rating", "A nota deve estar entre 1 e 5."),
    ("validation.invalid_year", "Ano letivo inválido."),
    ("validation.invalid_cpf", "CPF deve ter 11 dígitos."),
    ("validation.invalid_date_range", "A data final deve ser posterior à inicial."),
    ("validation.negative_value", "O valor não pode ser negativo."),
    ("validation.contact_required", "Informe nome e um contato, ou marque como anônima."),
];

const EN: &[(&str, &str)] = &[
    ("error.validation", "One or more fields are invalid."),
    ("error.email_exists", "This e-mail is already in use."),
    ("error.invalid_credentials", "Invalid e-mail or password."),
    ("error.invalid_token", "Missing or invalid authentication token."),
    ("error.user_not_found", "User not found."),
    ("error.forbidden", "You need the '{0}' permission to perform this action."),
    ("error.not_found", "{0} not found."),
    ("error.conflict", "{0} already exists."),
    ("error.invalid_transition", "Cannot change status from '{0}' to '{1}'."),
    ("error.forward_not_allowed", "Requests with status '{0}' cannot be forwarded."),
    ("error.conversation_closed", "Conversation {0} is closed."),
    ("error.unknown_module", "Module '{0}' does not exist."),
    ("error.duplicate_module", "Module '{0}' is listed more than once."),
    ("error.invalid_sort_field", "Cannot sort by '{0}'."),
    ("error.invalid_upload", "Invalid file: {0}."),
    ("error.internal", "An unexpected error occurred."),
    ("validation.required", "This field is required."),
    ("validation.invalid_email", "Invalid e-mail."),
    ("validation.min_6_chars", "Must be at least 6 characters long."),
    ("validation.min_10_chars", "Must be at least 10 characters long."),
    ("validation.max_length", "Text is too long."),
    ("validation.invalid_rating", "Rating must be between 1 and 5."),
    ("validation.invalid_year", "Invalid school year."),
    ("validation.invalid_cpf", "CPF must have 11 digits."),
    ("validation.invalid_date_range", "End date must be after start date."),
    ("validation.negative_value", "Value cannot be negative."),
    ("validation.contact_required", "Provide a name and a contact, or mark it as anonymous."),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_positional_placeholders() {
        let store = I18nStore::new();
        let msg = store.translate("en", "error.invalid_transition", &["open".into(), "completed".into()]);
        assert_eq!(msg, "Cannot change status from 'open' to 'completed'.");
    }

    #[test]
    fn missing_key_returns_the_key_itself() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "error.nope", &[]), "error.nope");
    }

    #[test]
    fn both_languages_define_the_same_keys() {
        let pt: Vec<_> = PT.iter().map(|(k, _)| *k).collect();
        let en: Vec<_> = EN.iter().map(|(k, _)| *k).collect();
        assert_eq!(pt, en);
    }
}
