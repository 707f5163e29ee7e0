//! Bidirectional mapping between list-view state and a flat query-string record.
//!
//! Decoding is lenient: every malformed or missing parameter falls back to the
//! view default and nothing here ever fails.

use std::collections::{BTreeMap, BTreeSet};

use querylens_protocol::list::{OrderOptions, QueryOptions, TimeRange};
use url::form_urlencoded;

/// Decoded query-string parameters.
pub type QueryParams = BTreeMap<String, String>;

/// Pending parameter writes; `None` removes the key.
pub type ParamUpdates = BTreeMap<String, Option<String>>;

pub mod keys {
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
    pub const DBS: &str = "dbs";
    pub const GROUPS: &str = "ru_groups";
    /// Older links used `groups`; only read, never written.
    pub const GROUPS_ALIAS: &str = "groups";
    pub const KINDS: &str = "kinds";
    pub const PLANS: &str = "plans";
    pub const TERM: &str = "term";
    pub const DIGEST: &str = "digest";
    pub const LIMIT: &str = "limit";
    pub const ORDER: &str = "order";
    pub const PAGE: &str = "page";

    /// Everything a filter reset clears. `order` is deliberately absent.
    pub const FILTERS: [&str; 10] = [
        FROM,
        TO,
        DBS,
        GROUPS,
        GROUPS_ALIAS,
        KINDS,
        PLANS,
        TERM,
        DIGEST,
        LIMIT,
    ];
}

/// `to` value marking a relative range whose `from` is a duration in seconds.
pub const RELATIVE_TO_TOKEN: &str = "now";

/// Full view state carried in the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlState {
    pub query: QueryOptions,
    pub order: OrderOptions,
    /// Zero-based page index.
    pub page: usize,
}

/// Partial state change to encode. Unset fields leave their keys untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub time_range: Option<TimeRange>,
    pub dbs: Option<BTreeSet<String>>,
    pub groups: Option<BTreeSet<String>>,
    pub kinds: Option<BTreeSet<String>>,
    pub plans: Option<BTreeSet<String>>,
    pub term: Option<String>,
    pub limit: Option<u32>,
    pub digest: Option<Option<String>>,
    pub order: Option<OrderOptions>,
    pub page: Option<usize>,
    /// Clear every filter key and the page, keeping the sort.
    pub reset: bool,
}

impl StatePatch {
    /// Patch replacing every filter with the values of `query`.
    pub fn from_query(query: &QueryOptions) -> Self {
        Self {
            time_range: Some(query.time_range),
            dbs: Some(query.dbs.clone()),
            groups: Some(query.groups.clone()),
            kinds: Some(query.kinds.clone()),
            plans: Some(query.plans.clone()),
            term: Some(query.term.clone()),
            limit: Some(query.limit),
            digest: Some(query.digest.clone()),
            ..Self::default()
        }
    }

    pub fn order(order: OrderOptions) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn page(page: usize) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::default()
        }
    }

    pub fn with_dbs<I, S>(mut self, dbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dbs = Some(dbs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    /// Whether the patch changes anything other than sort and page.
    pub fn touches_filters(&self) -> bool {
        self.reset
            || self.time_range.is_some()
            || self.dbs.is_some()
            || self.groups.is_some()
            || self.kinds.is_some()
            || self.plans.is_some()
            || self.term.is_some()
            || self.limit.is_some()
            || self.digest.is_some()
    }
}

/// Codec bound to one view's defaults.
#[derive(Debug, Clone)]
pub struct UrlStateCodec {
    default_query: QueryOptions,
    default_order: OrderOptions,
}

impl UrlStateCodec {
    pub fn new(default_query: QueryOptions, default_order: OrderOptions) -> Self {
        Self {
            default_query,
            default_order,
        }
    }

    pub fn default_query(&self) -> &QueryOptions {
        &self.default_query
    }

    pub fn default_order(&self) -> &OrderOptions {
        &self.default_order
    }

    pub fn decode(&self, params: &QueryParams) -> UrlState {
        let get = |key: &str| params.get(key).map(String::as_str);
        let defaults = &self.default_query;

        let time_range = decode_time_range(get(keys::FROM), get(keys::TO))
            .unwrap_or(defaults.time_range);

        let groups = get(keys::GROUPS)
            .or_else(|| get(keys::GROUPS_ALIAS))
            .map(split_set)
            .unwrap_or_default();

        let limit = get(keys::LIMIT)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.limit);

        let order = get(keys::ORDER)
            .and_then(OrderOptions::from_token)
            .unwrap_or_else(|| self.default_order.clone());

        let page = get(keys::PAGE)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(0);

        UrlState {
            query: QueryOptions {
                time_range,
                dbs: get(keys::DBS).map(split_set).unwrap_or_default(),
                groups,
                kinds: get(keys::KINDS).map(split_set).unwrap_or_default(),
                term: get(keys::TERM).unwrap_or_default().to_string(),
                limit,
                digest: get(keys::DIGEST)
                    .map(str::trim)
                    .filter(|digest| !digest.is_empty())
                    .map(str::to_string),
                plans: get(keys::PLANS).map(split_set).unwrap_or_default(),
            },
            order,
            page,
        }
    }

    /// Encodes a patch. Values equal to the view default encode as removals so
    /// that URLs only carry what differs from the default state.
    pub fn encode(&self, patch: &StatePatch) -> ParamUpdates {
        let mut updates = ParamUpdates::new();

        if patch.reset {
            for key in keys::FILTERS {
                updates.insert(key.to_string(), None);
            }
        }

        if let Some(range) = patch.time_range {
            let (from, to) = if range == self.default_query.time_range {
                (None, None)
            } else {
                let (from, to) = encode_time_range(range);
                (Some(from), Some(to))
            };
            updates.insert(keys::FROM.to_string(), from);
            updates.insert(keys::TO.to_string(), to);
        }

        let sets = [
            (keys::DBS, &patch.dbs),
            (keys::GROUPS, &patch.groups),
            (keys::KINDS, &patch.kinds),
            (keys::PLANS, &patch.plans),
        ];
        for (key, value) in sets {
            if let Some(set) = value {
                updates.insert(key.to_string(), join_set(set));
            }
        }
        if patch.groups.is_some() {
            updates.insert(keys::GROUPS_ALIAS.to_string(), None);
        }

        if let Some(term) = &patch.term {
            let term = (!term.is_empty()).then(|| term.clone());
            updates.insert(keys::TERM.to_string(), term);
        }

        if let Some(limit) = patch.limit {
            let limit = (limit != self.default_query.limit).then(|| limit.to_string());
            updates.insert(keys::LIMIT.to_string(), limit);
        }

        if let Some(digest) = &patch.digest {
            let digest = digest
                .as_deref()
                .map(str::trim)
                .filter(|digest| !digest.is_empty())
                .map(str::to_string);
            updates.insert(keys::DIGEST.to_string(), digest);
        }

        if let Some(order) = &patch.order {
            let token = (order != &self.default_order).then(|| order.to_token());
            updates.insert(keys::ORDER.to_string(), token);
        }

        match patch.page {
            Some(page) if page > 0 => {
                updates.insert(keys::PAGE.to_string(), Some(page.to_string()));
            }
            Some(_) => {
                updates.insert(keys::PAGE.to_string(), None);
            }
            None if patch.touches_filters() => {
                updates.insert(keys::PAGE.to_string(), None);
            }
            None => {}
        }

        updates
    }

    /// Encodes the complete state, e.g. to build a shareable link.
    pub fn encode_state(&self, state: &UrlState) -> ParamUpdates {
        let mut patch = StatePatch::from_query(&state.query);
        patch.order = Some(state.order.clone());
        patch.page = Some(state.page);
        self.encode(&patch)
    }
}

fn decode_time_range(from: Option<&str>, to: Option<&str>) -> Option<TimeRange> {
    let from = from?.trim();
    let to = to?.trim();

    if to.eq_ignore_ascii_case(RELATIVE_TO_TOKEN) {
        let seconds = from.parse::<u64>().ok().filter(|seconds| *seconds > 0)?;
        return Some(TimeRange::recent(seconds));
    }

    let start = from.parse::<i64>().ok()?;
    let end = to.parse::<i64>().ok()?;
    Some(TimeRange::absolute(start, end))
}

fn encode_time_range(range: TimeRange) -> (String, String) {
    match range {
        TimeRange::Recent { seconds } => (seconds.to_string(), RELATIVE_TO_TOKEN.to_string()),
        TimeRange::Absolute { start, end } => (start.to_string(), end.to_string()),
    }
}

fn split_set(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_set(set: &BTreeSet<String>) -> Option<String> {
    if set.is_empty() {
        None
    } else {
        Some(set.iter().cloned().collect::<Vec<_>>().join(","))
    }
}

/// Applies pending writes to a parameter record.
pub fn apply_updates(params: &mut QueryParams, updates: ParamUpdates) {
    for (key, value) in updates {
        match value {
            Some(value) => {
                params.insert(key, value);
            }
            None => {
                params.remove(&key);
            }
        }
    }
}

/// Renders parameters as an `application/x-www-form-urlencoded` string.
pub fn to_query_string(params: &QueryParams) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// Parses a query string (with or without the leading `?`). Later duplicates win.
pub fn parse_query_string(raw: &str) -> QueryParams {
    let raw = raw.trim().trim_start_matches('?');
    form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn codec() -> UrlStateCodec {
        UrlStateCodec::new(QueryOptions::default(), OrderOptions::descending("timestamp"))
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_params_decode_to_defaults() {
        let state = codec().decode(&QueryParams::new());
        assert_eq!(state.query, QueryOptions::default());
        assert_eq!(state.order, OrderOptions::descending("timestamp"));
        assert_eq!(state.page, 0);
    }

    #[test_case("not-a-number" ; "garbage")]
    #[test_case("-5" ; "negative")]
    #[test_case("0" ; "zero")]
    #[test_case("" ; "empty")]
    fn malformed_limit_falls_back_to_default(raw: &str) {
        let state = codec().decode(&params(&[("limit", raw)]));
        assert_eq!(state.query.limit, 100);
    }

    #[test_case(&[("from", "100"), ("to", "200")], TimeRange::absolute(100, 200) ; "absolute")]
    #[test_case(&[("from", "300"), ("to", "now")], TimeRange::recent(300) ; "relative")]
    #[test_case(&[("from", "100")], TimeRange::default() ; "missing to")]
    #[test_case(&[("from", "abc"), ("to", "200")], TimeRange::default() ; "non numeric from")]
    #[test_case(&[("from", "0"), ("to", "now")], TimeRange::default() ; "empty relative window")]
    fn decodes_time_range(pairs: &[(&str, &str)], expected: TimeRange) {
        assert_eq!(codec().decode(&params(pairs)).query.time_range, expected);
    }

    #[test]
    fn splits_list_parameters() {
        let state = codec().decode(&params(&[
            ("dbs", "test,,mysql, sales "),
            ("groups", "legacy"),
            ("kinds", "Select,Insert"),
        ]));
        assert_eq!(
            state.query.dbs.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["mysql", "sales", "test"]
        );
        assert!(state.query.groups.contains("legacy"));
        assert_eq!(state.query.kinds.len(), 2);
    }

    #[test]
    fn ru_groups_take_precedence_over_alias() {
        let state = codec().decode(&params(&[("ru_groups", "rg1"), ("groups", "rg2")]));
        assert_eq!(state.query.groups.len(), 1);
        assert!(state.query.groups.contains("rg1"));
    }

    #[test]
    fn decodes_signed_order_token() {
        let asc = codec().decode(&params(&[("order", "query_time")]));
        assert_eq!(asc.order, OrderOptions::ascending("query_time"));
        let desc = codec().decode(&params(&[("order", "-memory_max")]));
        assert_eq!(desc.order, OrderOptions::descending("memory_max"));
        let blank = codec().decode(&params(&[("order", "-")]));
        assert_eq!(blank.order, OrderOptions::descending("timestamp"));
    }

    #[test]
    fn round_trips_non_default_state() {
        let codec = codec();
        let state = UrlState {
            query: QueryOptions::default()
                .with_time_range(TimeRange::absolute(1_600_000_000, 1_600_003_600))
                .with_dbs(["app", "billing"])
                .with_groups(["rg_batch"])
                .with_kinds(["Select"])
                .with_term("select * from t where a = 'x&y'")
                .with_limit(500)
                .with_digest("9f2c")
                .with_plans(["p1", "p2"]),
            order: OrderOptions::ascending("query_time"),
            page: 4,
        };

        let mut params = QueryParams::new();
        apply_updates(&mut params, codec.encode_state(&state));
        let reparsed = parse_query_string(&to_query_string(&params));
        assert_eq!(codec.decode(&reparsed), state);
    }

    #[test_case(" 9f2c ", Some("9f2c") ; "padded")]
    #[test_case("   ", None ; "blank")]
    fn digest_is_trimmed_on_encode(raw: &str, expected: Option<&str>) {
        let codec = codec();
        let patch = StatePatch {
            digest: Some(Some(raw.to_string())),
            ..StatePatch::default()
        };
        let updates = codec.encode(&patch);
        assert_eq!(
            updates.get("digest").cloned().flatten().as_deref(),
            expected
        );

        let mut params = QueryParams::new();
        apply_updates(&mut params, updates);
        let reencoded = codec.encode_state(&codec.decode(&params));
        assert_eq!(reencoded.get("digest").cloned().flatten().as_deref(), expected);
    }

    #[test]
    fn default_values_encode_as_removals() {
        let codec = codec();
        let updates = codec.encode_state(&UrlState {
            query: QueryOptions::default(),
            order: OrderOptions::descending("timestamp"),
            page: 0,
        });
        assert!(updates.values().all(Option::is_none));
    }

    #[test]
    fn filter_change_clears_page() {
        let codec = codec();
        let mut params = params(&[("page", "3"), ("order", "query_time")]);
        apply_updates(&mut params, codec.encode(&StatePatch::default().with_dbs(["db1"])));

        assert!(!params.contains_key("page"));
        assert_eq!(params.get("dbs").map(String::as_str), Some("db1"));
        assert_eq!(params.get("order").map(String::as_str), Some("query_time"));
    }

    #[test]
    fn order_change_keeps_page() {
        let codec = codec();
        let mut params = params(&[("page", "3")]);
        apply_updates(
            &mut params,
            codec.encode(&StatePatch::order(OrderOptions::ascending("db"))),
        );
        assert_eq!(params.get("page").map(String::as_str), Some("3"));
        assert_eq!(params.get("order").map(String::as_str), Some("db"));
    }

    #[test]
    fn reset_clears_filters_but_preserves_sort() {
        let codec = codec();
        let mut params = params(&[
            ("dbs", "a"),
            ("ru_groups", "rg"),
            ("term", "select"),
            ("digest", "abc"),
            ("limit", "20"),
            ("from", "10"),
            ("to", "20"),
            ("page", "2"),
            ("order", "-query_time"),
            ("tab", "slow"),
        ]);
        apply_updates(&mut params, codec.encode(&StatePatch::reset()));

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("order").map(String::as_str), Some("-query_time"));
        assert_eq!(params.get("tab").map(String::as_str), Some("slow"));
        let state = codec.decode(&params);
        assert_eq!(state.query, QueryOptions::default());
        assert_eq!(state.order, OrderOptions::descending("query_time"));
    }

    #[test]
    fn free_text_survives_query_string_encoding() {
        let mut params = QueryParams::new();
        params.insert("term".into(), "a+b c&d=é".into());
        let raw = to_query_string(&params);
        assert!(!raw.contains('&'));
        assert_eq!(parse_query_string(&format!("?{raw}")), params);
    }
}
