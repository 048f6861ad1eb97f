//! Cookie-based authentication context.
//!
//! K_i: The pipeline passes credentials through without inspecting them;
//! only the HTTP client derives headers from them.

use std::collections::BTreeMap;
use std::fmt;

/// Cookie carrying the anti-forgery token for match-list requests.
pub const CSRF_COOKIE: &str = "_dnamatches-matchlistui-x-csrf-token";

/// Opaque cookie bundle sent with every request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookies: BTreeMap<String, String>,
}

impl Credentials {
    /// Parse a browser cookie string.
    ///
    /// Pairs are separated by `;` or newlines; pairs without `=` are ignored
    /// and later duplicates win.
    pub fn parse(cookie_string: &str) -> Self {
        let cookies = cookie_string
            .split([';', '\n'])
            .map(str::trim)
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { cookies }
    }

    /// Check if no cookies were supplied.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Look up a cookie value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Anti-forgery token: the CSRF cookie value up to the first `|` or `%7C`.
    pub fn csrf_token(&self) -> Option<&str> {
        let raw = self.get(CSRF_COOKIE)?;
        let token = raw.split("%7C").next()?.split('|').next()?;
        (!token.is_empty()).then_some(token)
    }
}

impl fmt::Debug for Credentials {
    // Never print cookie values
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}
