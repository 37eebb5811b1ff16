//! Mapping between AMQP field tables and the core header model.
//!
//! The AMQP type zoo is wider than what the retry headers need; every
//! integer width collapses to `Int`, strings and the odd exotic value
//! become `Str`. The mapping is lossy only for types no pipeline component
//! writes (nested tables, decimals), which degrade to their debug rendering
//! rather than being dropped.

use lapin::types::{AMQPValue, FieldTable};

use redrive_core::message::{HeaderTable, HeaderValue};

pub(crate) fn headers_from_table(table: &FieldTable) -> HeaderTable {
    let mut headers = HeaderTable::new();
    for (name, value) in table.inner() {
        headers.insert(name.as_str().to_string(), header_value(value));
    }
    headers
}

fn header_value(value: &AMQPValue) -> HeaderValue {
    match value {
        AMQPValue::Boolean(b) => HeaderValue::Bool(*b),
        AMQPValue::ShortShortInt(n) => HeaderValue::Int(i64::from(*n)),
        AMQPValue::ShortShortUInt(n) => HeaderValue::Int(i64::from(*n)),
        AMQPValue::ShortInt(n) => HeaderValue::Int(i64::from(*n)),
        AMQPValue::ShortUInt(n) => HeaderValue::Int(i64::from(*n)),
        AMQPValue::LongInt(n) => HeaderValue::Int(i64::from(*n)),
        AMQPValue::LongUInt(n) => HeaderValue::Int(i64::from(*n)),
        AMQPValue::LongLongInt(n) => HeaderValue::Int(*n),
        AMQPValue::Timestamp(ts) => {
            i64::try_from(*ts).map_or_else(|_| HeaderValue::Str(ts.to_string()), HeaderValue::Int)
        }
        AMQPValue::Float(f) => HeaderValue::Str(f.to_string()),
        AMQPValue::Double(d) => HeaderValue::Str(d.to_string()),
        AMQPValue::LongString(s) => {
            HeaderValue::Str(String::from_utf8_lossy(s.as_bytes()).into_owned())
        }
        AMQPValue::ByteArray(bytes) => HeaderValue::Bytes(bytes.as_slice().to_vec()),
        other => HeaderValue::Str(format!("{other:?}")),
    }
}

pub(crate) fn table_from_headers(headers: &HeaderTable) -> FieldTable {
    let mut table = FieldTable::default();
    for (name, value) in headers {
        let amqp = match value {
            HeaderValue::Bool(b) => AMQPValue::Boolean(*b),
            HeaderValue::Int(n) => AMQPValue::LongLongInt(*n),
            HeaderValue::Str(s) => AMQPValue::LongString(s.clone().into()),
            HeaderValue::Bytes(b) => AMQPValue::ByteArray(b.clone().into()),
        };
        table.insert(name.clone().into(), amqp);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_the_retry_headers() {
        let mut headers = HeaderTable::new();
        headers.insert("x-retry-count".to_string(), HeaderValue::Int(0));
        headers.insert("x-manual-retry".to_string(), HeaderValue::Bool(true));
        headers.insert(
            "x-dlq-reason".to_string(),
            HeaderValue::Str("max_retries_exceeded".to_string()),
        );

        let round_tripped = headers_from_table(&table_from_headers(&headers));
        assert_eq!(round_tripped, headers);
    }

    #[test]
    fn narrow_wire_integers_widen_to_int() {
        let mut table = FieldTable::default();
        // The Go workers write x-retry-count as an int32.
        table.insert("x-retry-count".to_string().into(), AMQPValue::LongInt(3));
        table.insert("attempt".to_string().into(), AMQPValue::ShortShortUInt(9));

        let headers = headers_from_table(&table);
        assert_eq!(headers.get("x-retry-count"), Some(&HeaderValue::Int(3)));
        assert_eq!(headers.get("attempt"), Some(&HeaderValue::Int(9)));
    }

    #[test]
    fn byte_arrays_survive_untouched() {
        let mut headers = HeaderTable::new();
        headers.insert(
            "x-trace-blob".to_string(),
            HeaderValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef]),
        );
        let round_tripped = headers_from_table(&table_from_headers(&headers));
        assert_eq!(round_tripped, headers);
    }
}
