//! Remote date-math resolution.
//!
//! Date-math names such as `<logstash-{now/d-1d}>` are evaluated by the
//! cluster, never locally. To learn what a clause resolves to, we ask the
//! cluster for an index that cannot exist, `<{random prefix}-{clause}>`, and
//! read the resolved name back out of the "not found" answer.

use std::sync::LazyLock;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use tracing::debug;

use crate::client::ClusterClient;
use crate::emit;
use crate::error::{ClientError, Error, Result};
use crate::metrics::events::DateMathResolved;

/// Leading part of every probe name.
pub const PROBE_PREFIX: &str = "hourglass_get_datemath_function_";

/// Length of the random element appended to [`PROBE_PREFIX`].
pub const RANDOM_ELEMENT_LEN: usize = 32;

/// `<prefix{math{format}}suffix>`: prefix, math clause, format, suffix.
static DATEMATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([^\{\}]*)?(\{.*(\{.*\})?\})([^\{\}]*)?>$").expect("Invalid regex pattern")
});

/// Something that can evaluate a date-math expression.
#[async_trait]
pub trait DateMathOracle: Send + Sync {
    /// Evaluate `expression` (a full `<...>` name) and return the name it
    /// resolves to.
    async fn resolve_expression(&self, expression: &str) -> Result<String, ClientError>;
}

/// Evaluates date math by probing a missing index on a [`ClusterClient`].
#[derive(Debug, Clone)]
pub struct IndexProbe<C> {
    client: C,
}

impl<C: ClusterClient> IndexProbe<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: ClusterClient> DateMathOracle for IndexProbe<C> {
    async fn resolve_expression(&self, expression: &str) -> Result<String, ClientError> {
        match self.client.get_index(expression).await {
            Err(ClientError::NotFound {
                index: Some(index), ..
            }) => Ok(index),
            Err(ClientError::NotFound { index: None, reason }) => {
                Err(ClientError::UnexpectedResponse {
                    message: format!("not found response carried no index name: {reason}"),
                })
            }
            Err(e) => Err(e),
            Ok(_) => Err(ClientError::UnexpectedResponse {
                message: format!("probe index {expression:?} unexpectedly exists"),
            }),
        }
    }
}

/// Generate the random part of a probe prefix.
pub fn random_element() -> String {
    let mut rng = rand::rng();
    (0..RANDOM_ELEMENT_LEN)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

/// Resolve a bare `{...}` clause to the name the cluster produces for it.
///
/// `random_element` replaces the generated part of the probe prefix, which
/// makes the probe name predictable in tests.
pub async fn resolve<O>(oracle: &O, clause: &str, random_element: Option<&str>) -> Result<String>
where
    O: DateMathOracle + ?Sized,
{
    if !clause.starts_with('{') || !clause.ends_with('}') || clause.contains(['<', '>']) {
        return Err(Error::configuration(format!(
            "The datemath clause {clause:?} must be a single \"{{...}}\" block without \"< >\""
        )));
    }

    let prefix = match random_element {
        Some(element) => format!("{PROBE_PREFIX}{element}"),
        None => format!("{PROBE_PREFIX}{}", self::random_element()),
    };
    let probe = format!("<{prefix}-{clause}>");
    debug!(%probe, "Random datemath string for extraction");

    let resolved = match oracle.resolve_expression(&probe).await {
        Ok(resolved) => resolved,
        Err(e) if e.is_client_rejection() => {
            emit!(DateMathResolved { success: false });
            return Err(Error::configuration(format!(
                "The datemath string {clause:?} does not contain a valid date pattern \
                 or has invalid characters: {e}"
            )));
        }
        Err(source) => {
            emit!(DateMathResolved { success: false });
            return Err(Error::FailedExecution {
                message: format!("Unable to resolve datemath string {clause:?}"),
                source,
            });
        }
    };
    debug!(%resolved, "Response index name for extraction");

    let stripped = resolved
        .strip_prefix(prefix.as_str())
        .and_then(|rest| rest.strip_prefix('-'));
    match stripped {
        Some(name) => {
            emit!(DateMathResolved { success: true });
            Ok(name.to_string())
        }
        None => {
            emit!(DateMathResolved { success: false });
            Err(Error::FailedExecution {
                message: format!("Unable to resolve datemath string {clause:?}"),
                source: ClientError::UnexpectedResponse {
                    message: format!("resolved name {resolved:?} does not start with the probe prefix"),
                },
            })
        }
    }
}

/// Whether `value` is wrapped in `< >`.
///
/// A value that only opens or only closes is an error.
///
/// # Examples
///
/// ```
/// use hourglass_core::datemath::is_datemath;
///
/// assert!(is_datemath("<logs-{now/d}>").unwrap());
/// assert!(!is_datemath("logs-2024.01.01").unwrap());
/// assert!(is_datemath("<logs-{now/d}").is_err());
/// ```
pub fn is_datemath(value: &str) -> Result<bool> {
    let mut chars = value.chars();
    let opener = chars.next();
    let closer = chars.next_back().or(opener);
    debug!(?opener, ?closer, "Checking datemath encapsulation");

    match (opener == Some('<'), closer == Some('>')) {
        (true, true) => Ok(true),
        (false, false) => Ok(false),
        _ => Err(Error::configuration(format!(
            "Incomplete datemath encapsulation in \"< >\" for {value:?}"
        ))),
    }
}

/// Resolve `value` if it is a date-math name, else return it unchanged.
///
/// The prefix before the first `{` and the suffix after the last `}` are
/// kept around the resolved clause.
pub async fn parse_date_math<O>(oracle: &O, value: &str) -> Result<String>
where
    O: DateMathOracle + ?Sized,
{
    if !is_datemath(value)? {
        return Ok(value.to_string());
    }
    debug!("Properly encapsulated, proceeding to next evaluation");

    let captures = DATEMATH_PATTERN.captures(value).ok_or_else(|| {
        Error::configuration(format!(
            "Value {value:?} does not contain a valid datemath pattern"
        ))
    })?;
    let group = |i| captures.get(i).map_or("", |m| m.as_str());
    let (prefix, clause, suffix) = (group(1), group(2), group(4));
    debug!(prefix, clause, suffix, "Split datemath name");

    let resolved = resolve(oracle, clause, None).await?;
    Ok(format!("{prefix}{resolved}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClusterClient, MockOracle};

    #[tokio::test]
    async fn test_resolve_strips_exact_prefix() {
        let element = "abcdefghijklmnopqrstuvwxyzabcdef";
        let probe = format!("<{PROBE_PREFIX}{element}-{{now/d}}>");
        let oracle = MockOracle::new().with(
            &probe,
            Ok(format!("{PROBE_PREFIX}{element}-2017.04.03")),
        );

        let resolved = resolve(&oracle, "{now/d}", Some(element)).await.unwrap();
        assert_eq!(resolved, "2017.04.03");
        assert_eq!(oracle.calls(), vec![probe]);
    }

    #[tokio::test]
    async fn test_resolve_keeps_dashes_in_resolved_name() {
        let oracle = MockOracle::new().with(
            &format!("<{PROBE_PREFIX}x-{{now/M{{YYYY-MM}}}}>"),
            Ok(format!("{PROBE_PREFIX}x-2017-04")),
        );
        let resolved = resolve(&oracle, "{now/M{YYYY-MM}}", Some("x")).await.unwrap();
        assert_eq!(resolved, "2017-04");
    }

    #[tokio::test]
    async fn test_resolve_generates_random_prefix() {
        let oracle = MockOracle::echoing(|probe| {
            let inner = probe.trim_start_matches('<').trim_end_matches('>');
            let (prefix, _) = inner.split_once("-{").unwrap();
            format!("{prefix}-2024.02.29")
        });

        assert_eq!(resolve(&oracle, "{now/d}", None).await.unwrap(), "2024.02.29");

        let probe = &oracle.calls()[0];
        let element = &probe[1 + PROBE_PREFIX.len()..1 + PROBE_PREFIX.len() + RANDOM_ELEMENT_LEN];
        assert!(element.chars().all(|c| c.is_ascii_lowercase()), "{probe}");
    }

    #[tokio::test]
    async fn test_resolve_rejects_malformed_clause() {
        let oracle = MockOracle::new();
        for clause in ["now/d", "{now/d", "<{now/d}>", "{now/d}>"] {
            let err = resolve(&oracle, clause, Some("x")).await.unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }), "{clause}");
        }
        assert!(oracle.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_classifies_remote_failures() {
        let probe = format!("<{PROBE_PREFIX}x-{{now/q}}>");
        let oracle = MockOracle::new().with(
            &probe,
            Err(ClientError::Rejected {
                status: 400,
                reason: "parse_exception".into(),
            }),
        );
        let err = resolve(&oracle, "{now/q}", Some("x")).await.unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let oracle = MockOracle::new().with(
            &probe,
            Err(ClientError::Transport {
                message: "connection refused".into(),
            }),
        );
        let err = resolve(&oracle, "{now/q}", Some("x")).await.unwrap_err();
        assert!(matches!(err, Error::FailedExecution { .. }));

        let oracle = MockOracle::new().with(&probe, Ok("someone-else-2017.04.03".into()));
        let err = resolve(&oracle, "{now/q}", Some("x")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::FailedExecution {
                source: ClientError::UnexpectedResponse { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_is_datemath() {
        assert!(is_datemath("<{now}>").unwrap());
        assert!(!is_datemath("index").unwrap());
        assert!(!is_datemath("").unwrap());
        assert!(is_datemath("<index").is_err());
        assert!(is_datemath("index>").is_err());
        assert!(is_datemath("<").is_err());
    }

    #[tokio::test]
    async fn test_parse_date_math_passthrough() {
        let oracle = MockOracle::new();
        assert_eq!(parse_date_math(&oracle, "plain-name").await.unwrap(), "plain-name");
        assert!(oracle.calls().is_empty());
    }

    #[tokio::test]
    async fn test_parse_date_math_keeps_prefix_and_suffix() {
        let oracle = MockOracle::echoing(|probe| {
            let inner = probe.trim_start_matches('<').trim_end_matches('>');
            let (prefix, _) = inner.split_once("-{").unwrap();
            format!("{prefix}-2017.03.01")
        });

        let name = parse_date_math(&oracle, "<logs-{now/M-1M}-archive>").await.unwrap();
        assert_eq!(name, "logs-2017.03.01-archive");
        assert!(oracle.calls()[0].ends_with("-{now/M-1M}>"));

        let name = parse_date_math(&oracle, "<{now/d}>").await.unwrap();
        assert_eq!(name, "2017.03.01");
    }

    #[tokio::test]
    async fn test_parse_date_math_rejects_unbraced() {
        let oracle = MockOracle::new();
        let err = parse_date_math(&oracle, "<logs-now>").await.unwrap_err();
        assert!(err.to_string().contains("valid datemath pattern"));
    }

    #[tokio::test]
    async fn test_index_probe_reads_not_found_index() {
        let client = MockClusterClient::new().with_index_probe(|name| ClientError::NotFound {
            index: Some(name.trim_start_matches('<').replace("{now/d}>", "2017.04.03")),
            reason: "no such index".into(),
        });
        let probe = IndexProbe::new(&client);
        let resolved = resolve(&probe, "{now/d}", Some("abc")).await.unwrap();
        assert_eq!(resolved, "2017.04.03");
    }

    #[tokio::test]
    async fn test_index_probe_existing_index_is_failure() {
        let client = MockClusterClient::new();
        let probe = IndexProbe::new(&client);
        let err = probe.resolve_expression("<x-{now}>").await.unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedResponse { .. }));
    }
}
