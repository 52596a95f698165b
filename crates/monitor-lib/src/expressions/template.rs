//! Placeholder substitution for query templates
//!
//! Templates reference selector fragments through `$`-prefixed tokens:
//! positional ones (`$1`, `$2`) and named meter tokens (`$step`,
//! `$nodeSelector`, ...). A token is always read as the longest run of
//! ASCII alphanumerics after the `$`, so `$1` never matches inside `$10`.
//! Tokens absent from the substitution map are left untouched, which keeps
//! regex back-references such as `label_replace(..., "$1", ...)` intact.

use std::collections::HashMap;

/// A placeholder a template can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Positional(u8),
    Step,
    Factor,
    NodeSelector,
    InstanceSelector,
    App,
    Svc,
    Pvc,
}

impl Token {
    fn parse(ident: &str) -> Option<Token> {
        if !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_digit()) {
            return ident.parse().ok().map(Token::Positional);
        }
        match ident {
            "step" => Some(Token::Step),
            "factor" => Some(Token::Factor),
            "nodeSelector" => Some(Token::NodeSelector),
            "instanceSelector" => Some(Token::InstanceSelector),
            "app" => Some(Token::App),
            "svc" => Some(Token::Svc),
            "pvc" => Some(Token::Pvc),
            _ => None,
        }
    }
}

/// Values to substitute for tokens
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: HashMap<Token, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, token: Token, value: impl Into<String>) -> &mut Self {
        self.values.insert(token, value.into());
        self
    }

    pub fn get(&self, token: Token) -> Option<&str> {
        self.values.get(&token).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every known token in `template` in a single pass
    ///
    /// Substituted text is not rescanned.
    pub fn render(&self, template: &str) -> String {
        if self.values.is_empty() {
            return template.to_string();
        }

        let mut out = String::with_capacity(template.len() + 64);
        let mut rest = template;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let ident_len = after
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric())
                .count();
            let ident = &after[..ident_len];

            match Token::parse(ident).and_then(|t| self.values.get(&t)) {
                Some(value) => out.push_str(value),
                None => {
                    out.push('$');
                    out.push_str(ident);
                }
            }
            rest = &after[ident_len..];
        }
        out.push_str(rest);
        out
    }
}
