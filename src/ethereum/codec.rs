//! Conversion between JSON arguments and ABI values.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::Function;
use alloy::primitives::{keccak256, Bytes};
use serde_json::Value;

use super::abi::ContractMethod;
use super::error::ClientError;

/// The 4-byte selector of a canonical function signature.
pub fn selector(call_signature: &str) -> [u8; 4] {
    let hash = keccak256(call_signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode a method invocation.
///
/// Without arguments only the selector derived from the call signature is
/// produced and the ABI entry is never consulted.
pub fn encode_call(method: &ContractMethod, args: &[Value]) -> Result<Bytes, ClientError> {
    if args.is_empty() {
        return Ok(Bytes::copy_from_slice(&selector(&method.call_signature)));
    }

    let function = method.entry()?;
    encode_function_call(function, args)
}

/// Encode selector + parameters for `function`.
pub fn encode_function_call(function: &Function, args: &[Value]) -> Result<Bytes, ClientError> {
    if args.len() != function.inputs.len() {
        let expected: Vec<String> = function
            .inputs
            .iter()
            .map(|input| format!("{} {}", input.ty, input.name))
            .collect();
        return Err(ClientError::Encoding(format!(
            "parameter count mismatch for '{}': expected {} parameters, got {}. Expected parameters: [{}]",
            function.name,
            function.inputs.len(),
            args.len(),
            expected.join(", ")
        )));
    }

    let mut values = Vec::with_capacity(args.len());
    for (i, (input, arg)) in function.inputs.iter().zip(args).enumerate() {
        let ty = input.resolve().map_err(|e| {
            ClientError::Encoding(format!(
                "unsupported type '{}' for parameter #{}: {}",
                input.ty,
                i + 1,
                e
            ))
        })?;
        let value = json_to_dyn_sol_value(arg, &ty).map_err(|e| {
            ClientError::Encoding(format!(
                "invalid parameter #{} ('{}' of type '{}'): {}",
                i + 1,
                input.name,
                input.ty,
                e
            ))
        })?;
        values.push(value);
    }

    function
        .abi_encode_input(&values)
        .map(Bytes::from)
        .map_err(|e| ClientError::Encoding(format!("failed to encode inputs: {}", e)))
}

/// Decode call output using the entry's declared `outputs`.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Value, ClientError> {
    if function.outputs.is_empty() {
        return Err(ClientError::Schema(format!(
            "'{}' declares no outputs",
            function.name
        )));
    }

    let decoded = function
        .abi_decode_output(data, false)
        .map_err(|e| ClientError::Schema(format!("failed to decode output: {}", e)))?;

    dyn_sol_values_to_json(&decoded)
}

/// Convert a JSON value to a `DynSolValue` of the expected Solidity type.
///
/// Scalars go through the type's string coercion so that numbers may be
/// given as JSON numbers, decimal strings or `0x` hex strings.
pub fn json_to_dyn_sol_value(value: &Value, ty: &DynSolType) -> Result<DynSolValue, String> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => items
            .iter()
            .map(|item| json_to_dyn_sol_value(item, inner))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Array),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(format!("expected {} elements, got {}", len, items.len()));
            }
            items
                .iter()
                .map(|item| json_to_dyn_sol_value(item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray)
        }
        (DynSolType::Tuple(types), Value::Array(items)) => {
            if items.len() != types.len() {
                return Err(format!(
                    "expected a tuple of {} elements, got {}",
                    types.len(),
                    items.len()
                ));
            }
            types
                .iter()
                .zip(items)
                .map(|(ty, item)| json_to_dyn_sol_value(item, ty))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple)
        }
        (_, Value::String(s)) => ty.coerce_str(s).map_err(|e| e.to_string()),
        (_, Value::Number(n)) => ty.coerce_str(&n.to_string()).map_err(|e| e.to_string()),
        (_, Value::Bool(b)) => ty
            .coerce_str(if *b { "true" } else { "false" })
            .map_err(|e| e.to_string()),
        (ty, other) => Err(format!("cannot convert {} to {}", other, ty.sol_type_name())),
    }
}

/// Convert decoded return values to JSON
pub fn dyn_sol_values_to_json(values: &[DynSolValue]) -> Result<Value, ClientError> {
    if values.len() == 1 {
        dyn_sol_value_to_json(&values[0])
    } else {
        values
            .iter()
            .map(dyn_sol_value_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

fn dyn_sol_value_to_json(value: &DynSolValue) -> Result<Value, ClientError> {
    match value {
        DynSolValue::Address(addr) => Ok(Value::String(format!("0x{:x}", addr))),
        DynSolValue::Uint(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Int(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
        DynSolValue::FixedBytes(word, size) => Ok(Value::String(format!(
            "0x{}",
            hex::encode(&word[..*size])
        ))),
        DynSolValue::Array(items)
        | DynSolValue::FixedArray(items)
        | DynSolValue::Tuple(items) => items
            .iter()
            .map(dyn_sol_value_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(ClientError::Schema(format!(
            "unsupported return value: {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::test_support::{token_abi, TOKEN_ADDRESS};
    use alloy::primitives::U256;
    use serde_json::json;

    fn method(name: &str, signature: &str) -> ContractMethod {
        ContractMethod::new(name, signature, TOKEN_ADDRESS, token_abi())
    }

    #[test]
    fn selector_matches_known_values() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("Error(string)"), [0x08, 0xc3, 0x79, 0xa0]);
    }

    #[test]
    fn zero_argument_call_skips_abi_resolution() {
        // The name does not exist in the ABI; a bare call never looks it up.
        let method = method("notInAbi", "totalSupply()");
        let encoded = encode_call(&method, &[]).unwrap();
        assert_eq!(encoded.as_ref(), &[0x18, 0x16, 0x0d, 0xdd]);
        assert!(!method.is_resolved());
    }

    #[test]
    fn arguments_are_fully_encoded() {
        let method = method("transfer", "transfer(address,uint256)");
        let encoded = encode_call(
            &method,
            &[json!("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e"), json!(1000)],
        )
        .unwrap();

        assert_eq!(encoded.len(), 4 + 32 + 32);
        assert_eq!(&encoded[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(U256::from_be_slice(&encoded[36..68]), U256::from(1000));
        assert!(method.is_resolved());
    }

    #[test]
    fn arguments_against_unknown_name_fail_with_not_found() {
        let method = method("mint", "mint(uint256)");
        let err = encode_call(&method, &[json!(1)]).unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[test]
    fn parameter_count_mismatch() {
        let method = method("transfer", "transfer(address,uint256)");
        let err = encode_call(&method, &[json!(1)]).unwrap_err();
        assert!(matches!(err, ClientError::Encoding(_)));
    }

    #[test]
    fn json_coercion_handles_numbers_and_arrays() {
        let ty = DynSolType::parse("uint8[]").unwrap();
        let value = json_to_dyn_sol_value(&json!([1, "0x02", "3"]), &ty).unwrap();
        assert_eq!(
            value,
            DynSolValue::Array(vec![
                DynSolValue::Uint(U256::from(1), 8),
                DynSolValue::Uint(U256::from(2), 8),
                DynSolValue::Uint(U256::from(3), 8),
            ])
        );

        let ty = DynSolType::parse("bool").unwrap();
        assert_eq!(
            json_to_dyn_sol_value(&json!(true), &ty).unwrap(),
            DynSolValue::Bool(true)
        );
        assert!(json_to_dyn_sol_value(&json!({"a": 1}), &ty).is_err());
    }

    #[test]
    fn decode_single_and_multiple_outputs() {
        let abi = token_abi();
        let balance_of = crate::ethereum::abi::resolve("balanceOf", &abi).unwrap();
        let data = DynSolValue::Uint(U256::from(42), 256).abi_encode();
        assert_eq!(decode_output(balance_of, &data).unwrap(), json!("42"));

        let reserves = crate::ethereum::abi::resolve("getReserves", &abi).unwrap();
        let data = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(7), 112),
            DynSolValue::Bool(false),
        ])
        .abi_encode_params();
        assert_eq!(
            decode_output(reserves, &data).unwrap(),
            json!(["7", false])
        );
    }

    #[test]
    fn decode_without_outputs_is_a_schema_error() {
        let abi = token_abi();
        let burn = crate::ethereum::abi::resolve("burn", &abi).unwrap();
        assert!(matches!(
            decode_output(burn, &[0u8; 32]),
            Err(ClientError::Schema(_))
        ));
    }
}
