use crate::err_create;
use crate::error::{ErrorBag, RelayError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use web3::types::{Address, U256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
    pub v: u8,
    pub r: String,
    pub s: String,
}

/// Transfer request as submitted by the client and carried by the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub owner: String,
    pub recipient: String,
    pub transfer_to: String,
    pub amount: String,
    pub deadline: String,
    pub signature: PermitSignature,
    pub chain: String,
    pub token_address: String,
    /// Assigned by the HTTP boundary before enqueueing
    #[serde(default)]
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub order_id: String,
    pub chain: String,
    pub owner: Address,
    /// Spender named in the permit
    pub recipient: Address,
    pub transfer_to: Address,
    pub token_address: Address,
    pub amount: U256,
    pub deadline: U256,
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

fn parse_address(field: &str, value: &str) -> Result<Address, RelayError> {
    Address::from_str(value.trim()).map_err(|err| {
        err_create!(ErrorBag::DecodeError(format!(
            "invalid {field} address {value}: {err}"
        )))
    })
}

fn parse_bytes32(field: &str, value: &str) -> Result<[u8; 32], RelayError> {
    let trimmed = value.trim();
    let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed)).map_err(|err| {
        err_create!(ErrorBag::DecodeError(format!(
            "invalid signature {field} {value}: {err}"
        )))
    })?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        err_create!(ErrorBag::DecodeError(format!(
            "signature {field} has {} bytes, expected 32",
            bytes.len()
        )))
    })
}

/// Base 10 unsigned integer, anything above 2^256-1 is a build error
fn parse_uint(value: &str, invalid: fn(String) -> ErrorBag) -> Result<U256, RelayError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err_create!(invalid(value.to_string())));
    }
    U256::from_dec_str(value).map_err(|err| {
        err_create!(ErrorBag::BuildError(format!(
            "value {value} does not fit in uint256: {err:?}"
        )))
    })
}

impl TransferRequest {
    pub fn decode(payload: &[u8]) -> Result<Self, RelayError> {
        let request: TransferRequest = serde_json::from_slice(payload)
            .map_err(|err| err_create!(ErrorBag::DecodeError(err.to_string())))?;
        if request.order_id.is_empty() {
            return Err(err_create!(ErrorBag::DecodeError(
                "missing orderId".to_string()
            )));
        }
        Ok(request)
    }

    pub fn validate(&self) -> Result<ValidatedTransfer, RelayError> {
        Ok(ValidatedTransfer {
            order_id: self.order_id.clone(),
            chain: self.chain.clone(),
            amount: parse_uint(&self.amount, ErrorBag::InvalidAmount)?,
            deadline: parse_uint(&self.deadline, ErrorBag::InvalidDeadline)?,
            owner: parse_address("owner", &self.owner)?,
            recipient: parse_address("recipient", &self.recipient)?,
            transfer_to: parse_address("transferTo", &self.transfer_to)?,
            token_address: parse_address("tokenAddress", &self.token_address)?,
            v: self.signature.v,
            r: parse_bytes32("r", &self.signature.r)?,
            s: parse_bytes32("s", &self.signature.s)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TransferRequest {
        TransferRequest {
            owner: "0x1111111111111111111111111111111111111111".to_string(),
            recipient: "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".to_string(),
            transfer_to: "0x3333333333333333333333333333333333333333".to_string(),
            amount: "1000000".to_string(),
            deadline: "1900000000".to_string(),
            signature: PermitSignature {
                v: 28,
                r: format!("0x{}", "ab".repeat(32)),
                s: "cd".repeat(32),
            },
            chain: "polygon".to_string(),
            token_address: "0x2222222222222222222222222222222222222222".to_string(),
            order_id: "order-1".to_string(),
        }
    }

    #[test]
    fn test_camel_case_payload() {
        let value = serde_json::to_value(request()).unwrap();
        assert!(value.get("transferTo").is_some());
        assert!(value.get("tokenAddress").is_some());
        assert!(value.get("orderId").is_some());
        let decoded =
            TransferRequest::decode(serde_json::to_string(&value).unwrap().as_bytes()).unwrap();
        assert_eq!(decoded, request());
    }

    #[test]
    fn test_decode_errors() {
        let err = TransferRequest::decode(b"{not json").unwrap_err();
        assert!(matches!(err.inner, ErrorBag::DecodeError(_)));

        let mut req = request();
        req.order_id = String::new();
        let err = TransferRequest::decode(serde_json::to_string(&req).unwrap().as_bytes())
            .unwrap_err();
        assert!(matches!(err.inner, ErrorBag::DecodeError(_)));
    }

    #[test]
    fn test_validate() {
        let validated = request().validate().unwrap();
        assert_eq!(validated.amount, U256::from(1_000_000));
        assert_eq!(validated.deadline, U256::from(1_900_000_000u64));
        assert_eq!(validated.r, [0xab; 32]);
        assert_eq!(validated.s, [0xcd; 32]);
        assert_eq!(validated.v, 28);
    }

    #[test]
    fn test_invalid_amount_and_deadline() {
        let mut req = request();
        req.amount = "12abc".to_string();
        let err = req.validate().unwrap_err();
        assert!(matches!(err.inner, ErrorBag::InvalidAmount(ref v) if v == "12abc"));

        let mut req = request();
        req.amount = "-5".to_string();
        assert!(matches!(req.validate().unwrap_err().inner, ErrorBag::InvalidAmount(_)));

        let mut req = request();
        req.deadline = "tomorrow".to_string();
        assert!(matches!(req.validate().unwrap_err().inner, ErrorBag::InvalidDeadline(_)));

        let mut req = request();
        req.amount = "9".repeat(80);
        assert!(matches!(req.validate().unwrap_err().inner, ErrorBag::BuildError(_)));
    }

    #[test]
    fn test_invalid_signature_and_address() {
        let mut req = request();
        req.signature.r = "0xabcd".to_string();
        assert!(matches!(req.validate().unwrap_err().inner, ErrorBag::DecodeError(_)));

        let mut req = request();
        req.owner = "0x1234".to_string();
        assert!(matches!(req.validate().unwrap_err().inner, ErrorBag::DecodeError(_)));
    }
}
