use serde_json::Value as JsonValue;

use crate::error::SqlRelayError;
use crate::protocol::Method;

use super::OperationHandler;

/// Map a wire method and its positional params onto the handler contract.
///
/// # Errors
/// Returns [`SqlRelayError::ParameterError`] when a required param is missing
/// or mistyped, or whatever the handler itself fails with.
pub async fn dispatch<H>(
    handler: &mut H,
    method: Method,
    params: &[JsonValue],
) -> Result<JsonValue, SqlRelayError>
where
    H: OperationHandler + ?Sized,
{
    match method {
        Method::Connect => handler.connect(required_str(params, 0, "path")?).await,
        Method::Disconnect => handler.disconnect().await,
        Method::Execute => {
            handler
                .execute(required_str(params, 0, "sql")?, statement_args(params))
                .await
        }
        Method::Prepare => handler.prepare(required_str(params, 0, "sql")?).await,
        Method::Run => {
            handler
                .run(required_str(params, 0, "sql")?, statement_args(params))
                .await
        }
        Method::Get => {
            handler
                .get(required_str(params, 0, "sql")?, statement_args(params))
                .await
        }
        Method::All => {
            handler
                .all(required_str(params, 0, "sql")?, statement_args(params))
                .await
        }
        Method::Finalize => handler.finalize(required_str(params, 0, "sql")?).await,
    }
}

fn required_str<'a>(
    params: &'a [JsonValue],
    idx: usize,
    what: &str,
) -> Result<&'a str, SqlRelayError> {
    params.get(idx).and_then(JsonValue::as_str).ok_or_else(|| {
        SqlRelayError::ParameterError(format!("param {idx} ({what}) must be a string"))
    })
}

// Positional statement arguments ride in params[1]; anything that is not an
// array is treated as absent.
fn statement_args(params: &[JsonValue]) -> &[JsonValue] {
    params
        .get(1)
        .and_then(JsonValue::as_array)
        .map_or(&[], Vec::as_slice)
}
