//! WWW-Authenticate parsing and RFC 2617 response computation

use super::types::DigestAlgorithm;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Nonce count sent with every authorized request.
///
/// Each call performs a fresh handshake, so the server nonce is only ever used once.
pub const NONCE_COUNT: &str = "00000001";

/// Server-issued Digest challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    /// Selected quality of protection (`auth`), None for RFC 2069 servers
    pub qop: Option<String>,
    pub opaque: Option<String>,
    pub algorithm: DigestAlgorithm,
}

impl DigestChallenge {
    /// Parse a single `WWW-Authenticate` header value
    pub fn parse(header: &str) -> Result<Self, String> {
        let params = strip_digest_scheme(header)
            .ok_or_else(|| format!("not a Digest challenge: {}", header))?;
        let mut params = parse_auth_params(params)?;

        let realm = params
            .remove("realm")
            .ok_or_else(|| "challenge has no realm".to_string())?;
        let nonce = params
            .remove("nonce")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "challenge has no nonce".to_string())?;

        let algorithm = match params.remove("algorithm") {
            Some(name) => DigestAlgorithm::parse(&name)
                .ok_or_else(|| format!("unsupported algorithm: {}", name))?,
            None => DigestAlgorithm::Md5,
        };

        let qop = match params.remove("qop") {
            Some(list) => {
                if list.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")) {
                    Some("auth".to_string())
                } else {
                    return Err(format!("unsupported qop: {}", list));
                }
            }
            None => None,
        };

        Ok(Self {
            realm,
            nonce,
            qop,
            opaque: params.remove("opaque"),
            algorithm,
        })
    }

    /// Pick and parse the Digest challenge among several header values
    pub fn from_headers<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        let mut seen = Vec::new();
        for value in values {
            if strip_digest_scheme(value).is_some() {
                return Self::parse(value);
            }
            seen.push(value);
        }

        if seen.is_empty() {
            Err("missing WWW-Authenticate header".to_string())
        } else {
            Err(format!("no Digest challenge offered: {}", seen.join("; ")))
        }
    }

    /// Compute the authorization for one request
    pub fn respond(
        &self,
        method: &str,
        uri: &str,
        username: &str,
        password: &str,
        cnonce: &str,
    ) -> DigestResponse {
        let alg = self.algorithm;

        let mut ha1 = alg.hash(&format!("{}:{}:{}", username, self.realm, password));
        if alg == DigestAlgorithm::Md5Sess {
            ha1 = alg.hash(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = alg.hash(&format!("{}:{}", method, uri));

        let response = match &self.qop {
            Some(qop) => alg.hash(&format!(
                "{}:{}:{}:{}:{}:{}",
                ha1, self.nonce, NONCE_COUNT, cnonce, qop, ha2
            )),
            None => alg.hash(&format!("{}:{}:{}", ha1, self.nonce, ha2)),
        };

        DigestResponse {
            username: username.to_string(),
            realm: self.realm.clone(),
            nonce: self.nonce.clone(),
            uri: uri.to_string(),
            algorithm: alg,
            response,
            qop: self.qop.clone(),
            cnonce: cnonce.to_string(),
            opaque: self.opaque.clone(),
        }
    }
}

/// Computed Digest credentials for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResponse {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub algorithm: DigestAlgorithm,
    pub response: String,
    pub qop: Option<String>,
    pub cnonce: String,
    pub opaque: Option<String>,
}

impl DigestResponse {
    /// `Authorization` header value
    pub fn header_value(&self) -> String {
        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
            quote_escape(&self.username),
            quote_escape(&self.realm),
            quote_escape(&self.nonce),
            quote_escape(&self.uri),
            self.algorithm.as_str(),
            self.response,
        );

        if let Some(qop) = &self.qop {
            let _ = write!(
                header,
                ", qop={}, nc={}, cnonce=\"{}\"",
                qop,
                NONCE_COUNT,
                quote_escape(&self.cnonce)
            );
        }
        if let Some(opaque) = &self.opaque {
            let _ = write!(header, ", opaque=\"{}\"", quote_escape(opaque));
        }

        header
    }
}

/// Returns the parameter part if `header` uses the Digest scheme
fn strip_digest_scheme(header: &str) -> Option<&str> {
    let header = header.trim_start();
    let scheme = header.get(..6)?;
    if !scheme.eq_ignore_ascii_case("digest") {
        return None;
    }
    let rest = &header[6..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

/// Tokenize comma-separated `key=value` pairs.
///
/// Values may be quoted (quotes stripped, backslash escapes honored) or bare.
/// Keys are lowercased. An unquoted `qop` list (`qop=auth,auth-int`) is
/// kept whole.
pub fn parse_auth_params(input: &str) -> Result<HashMap<String, String>, String> {
    let mut params: HashMap<String, String> = HashMap::new();
    let mut chars = input.chars().peekable();
    // previous parameter was an unquoted qop value
    let mut bare_qop = false;

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if bare_qop && chars.peek() != Some(&'=') {
            if let Some(qop) = params.get_mut("qop") {
                qop.push(',');
                qop.push_str(&key);
                continue;
            }
        }
        if chars.next() != Some('=') {
            return Err(format!("expected '=' after parameter {:?}", key));
        }
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let key = key.to_ascii_lowercase();
        let quoted = chars.peek() == Some(&'"');
        let value = if quoted {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(c) => value.push(c),
                        None => return Err(format!("unterminated value for {:?}", key)),
                    },
                    Some('"') => break,
                    Some(c) => value.push(c),
                    None => return Err(format!("unterminated value for {:?}", key)),
                }
            }
            value
        } else {
            let mut value = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value.trim_end().to_string()
        };

        bare_qop = !quoted && key == "qop";
        params.insert(key, value);
    }

    Ok(params)
}

fn quote_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
