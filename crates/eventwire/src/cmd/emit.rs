use std::sync::{Arc, Mutex};

use eventwire_peer::{PeerError, Provider};
use serde_json::Value;

use crate::cmd::EmitArgs;
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{render_sent, OutputFormat};

pub fn run(args: EmitArgs, format: OutputFormat) -> CliResult<i32> {
    let values = resolve_args(&args)?;

    let provider = Provider::new();
    let first_error: Arc<Mutex<Option<CliError>>> = Arc::new(Mutex::new(None));
    {
        let first_error = Arc::clone(&first_error);
        provider.on_error(move |err: &PeerError| {
            let mut slot = first_error
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(peer_error("emit failed", err));
            }
        });
    }

    provider
        .connect(&args.address)
        .map_err(|err| peer_error("connect failed", &err))?;
    provider.emit(args.event.as_str(), values.clone());
    provider.end();
    provider
        .wait()
        .map_err(|err| peer_error("emit failed", &err))?;

    let failed = first_error
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .take();
    if let Some(err) = failed {
        return Err(err);
    }

    println!(
        "{}",
        render_sent(&args.address.to_string(), &args.event, &values, format)
    );
    Ok(SUCCESS)
}

/// Build the argument list from `--args` or the repeated `--arg` flags.
fn resolve_args(args: &EmitArgs) -> CliResult<Vec<Value>> {
    if let Some(all) = &args.args {
        return match serde_json::from_str::<Value>(all) {
            Ok(Value::Array(values)) => Ok(values),
            Ok(_) => Err(CliError::new(USAGE, "--args must be a JSON array")),
            Err(err) => Err(CliError::new(
                USAGE,
                format!("--args is not valid JSON: {err}"),
            )),
        };
    }

    args.arg
        .iter()
        .map(|raw| {
            serde_json::from_str::<Value>(raw).map_err(|err| {
                CliError::new(USAGE, format!("--arg {raw:?} is not valid JSON: {err}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use eventwire_transport::Address;
    use serde_json::json;

    use super::*;

    fn emit_args(args: Option<&str>, arg: &[&str]) -> EmitArgs {
        EmitArgs {
            address: Address::tcp_port(1),
            event: "greet".into(),
            args: args.map(str::to_string),
            arg: arg.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn args_array_is_spread() {
        let values = resolve_args(&emit_args(Some(r#"[{"name":"Ada"},2]"#), &[])).unwrap();
        assert_eq!(values, vec![json!({ "name": "Ada" }), json!(2)]);
    }

    #[test]
    fn repeated_arg_builds_list() {
        let values = resolve_args(&emit_args(None, &["1", r#""two""#, "null"])).unwrap();
        assert_eq!(values, vec![json!(1), json!("two"), json!(null)]);
    }

    #[test]
    fn no_args_is_empty_list() {
        assert!(resolve_args(&emit_args(None, &[])).unwrap().is_empty());
    }

    #[test]
    fn non_array_args_is_usage_error() {
        let err = resolve_args(&emit_args(Some(r#"{"a":1}"#), &[])).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn invalid_arg_is_usage_error() {
        let err = resolve_args(&emit_args(None, &["not json"])).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("--arg"));
    }
}
