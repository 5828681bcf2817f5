#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::ops::Deref;
use std::path::Path;
use chrono::{Utc, SecondsFormat};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// The single query parameter understood by the greeting endpoint.
pub const NAME_PARAM: &str = "name";

// URI component encoding: everything but A-Z a-z 0-9 - _ . ! ~ * ( ) is
// escaped.  The apostrophe stays escaped because the url crate would rewrite
// it to %27 in http query strings anyway.
const NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-').remove(b'_').remove(b'.').remove(b'!')
    .remove(b'~').remove(b'*').remove(b'(').remove(b')');

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  The difference between
 * absolutize and standard canonicalize methods is that absolutize does not
 * care about whether the file exists and what the file really is.
 *
 * On any expansion or conversion failure the original path is returned.
 */
pub fn get_absolute_path(path: &str) -> String {
    // Replace ~ and environment variable values if possible.
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    // Convert to absolute path if necessary.
    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    let p2 = match p1.to_str() {
        Some(x) => x,
        None => return path.to_owned(),
    };

    p2.to_owned()
}

// ---------------------------------------------------------------------------
// timestamp_str:
// ---------------------------------------------------------------------------
/** Get the current UTC timestamp as a string in rfc3339 format, which looks
 * like this:  2022-09-13T14:14:42.719849Z
 */
pub fn timestamp_str() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// parse_base_url:
// ---------------------------------------------------------------------------
/** Validate the configured server address once so that per-request URL
 * construction cannot fail on the base part.
 */
pub fn parse_base_url(base_url: &str) -> Result<Url, Errors> {
    let url = Url::parse(base_url)
        .map_err(|e| Errors::InvalidUrl(format!("{}: {}", base_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(Errors::InvalidUrl(format!("{}: not a hierarchical URL", base_url)));
    }
    Ok(url)
}

// ---------------------------------------------------------------------------
// build_greeting_url:
// ---------------------------------------------------------------------------
/** Construct the greeting request URL.  The endpoint path replaces whatever
 * path the base carries and the name is the only query parameter.  The name
 * is percent-encoded as a URI component (space is %20, + is %2B) so reserved
 * characters and non-ASCII letters decode back to the exact input.
 */
pub fn build_greeting_url(base: &Url, endpoint_path: &str, name: &str) -> Result<Url, Errors> {
    let mut url = base.join(endpoint_path)
        .map_err(|e| Errors::InvalidUrl(format!("{}{}: {}", base, endpoint_path, e)))?;
    let query = format!("{}={}", NAME_PARAM, utf8_percent_encode(name, NAME_ENCODE_SET));
    url.set_query(Some(&query));
    url.set_fragment(None);
    Ok(url)
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    use percent_encoding::percent_decode_str;

    // Plain percent-decoding, no form rules: '+' stays '+'.
    fn decoded_name(url: &Url) -> Option<String> {
        let encoded = url.query()?.strip_prefix("name=")?;
        percent_decode_str(encoded).decode_utf8().ok().map(|v| v.into_owned())
    }

    #[test]
    fn plain_name() {
        let base = parse_base_url("http://localhost:35000").unwrap();
        let url = build_greeting_url(&base, "/api/saludo", "Carlos").unwrap();
        assert_eq!(url.as_str(), "http://localhost:35000/api/saludo?name=Carlos");
    }

    #[test]
    fn reserved_and_non_ascii_names_round_trip() {
        let base = parse_base_url("http://localhost:35000/").unwrap();
        for name in ["Ana María", "Tom & Jerry", "a=b", "#hash", "1+1", "José Ñúñez", "名前", "100%"] {
            let url = build_greeting_url(&base, "/api/saludo", name).unwrap();
            let query = url.query().unwrap();
            assert!(!query.contains(' '), "unencoded space in {}", query);
            assert_eq!(query.matches('&').count(), 0, "unencoded & in {}", query);
            assert!(query.is_ascii(), "non-ascii query {}", query);
            assert_eq!(url.fragment(), None);
            assert_eq!(decoded_name(&url).as_deref(), Some(name));
        }
    }

    #[test]
    fn uri_component_encoding() {
        let base = parse_base_url("http://localhost:35000").unwrap();
        let cases = [
            ("Ana María", "name=Ana%20Mar%C3%ADa"),
            ("1+1", "name=1%2B1"),
            ("Tom & Jerry", "name=Tom%20%26%20Jerry"),
            ("O'Brien", "name=O%27Brien"),
            ("a-b_c.d!~*()", "name=a-b_c.d!~*()"),
        ];
        for (name, expected) in cases {
            let url = build_greeting_url(&base, "/api/saludo", name).unwrap();
            assert_eq!(url.query(), Some(expected));
            assert_eq!(decoded_name(&url).as_deref(), Some(name));
        }
    }

    #[test]
    fn endpoint_path_replaces_base_path() {
        let base = parse_base_url("http://localhost:35000/index.html?v=45#eventos").unwrap();
        let url = build_greeting_url(&base, "/api/saludo", "Ana").unwrap();
        assert_eq!(url.path(), "/api/saludo");
        assert_eq!(url.query(), Some("name=Ana"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn bad_base_urls() {
        assert!(matches!(parse_base_url("not a url"), Err(Errors::InvalidUrl(_))));
        assert!(matches!(parse_base_url("mailto:ana@example.com"), Err(Errors::InvalidUrl(_))));
    }

    #[test]
    fn absolute_path() {
        let p = get_absolute_path("some/relative/dir");
        assert!(Path::new(&p).is_absolute());
    }
}
