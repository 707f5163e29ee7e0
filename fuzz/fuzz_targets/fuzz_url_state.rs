// Fuzz target feeding arbitrary query strings through the URL state codec.
#![no_main]

use libfuzzer_sys::fuzz_target;
use querylens_controller::url_state::{
    apply_updates, parse_query_string, to_query_string, QueryParams, UrlStateCodec,
};
use querylens_protocol::list::{OrderOptions, QueryOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let codec = UrlStateCodec::new(QueryOptions::default(), OrderOptions::descending("timestamp"));
    let state = codec.decode(&parse_query_string(raw));

    // Whatever decodes must survive a trip through the encoder unchanged.
    let mut params = QueryParams::new();
    apply_updates(&mut params, codec.encode_state(&state));
    let again = codec.decode(&parse_query_string(&to_query_string(&params)));
    assert_eq!(again, state);
});
