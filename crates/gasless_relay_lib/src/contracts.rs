use lazy_static::lazy_static;

use crate::err_custom_create;
use crate::error::RelayError;
use web3::ethabi::{Contract, Token};
use web3::types::{Address, U256};

lazy_static! {
    pub static ref ERC20_PERMIT_ABI: Contract =
        prepare_contract_abi(include_bytes!("../contracts/ierc20_permit.json")).unwrap();
}

pub fn prepare_contract_abi(json_abi: &[u8]) -> Result<Contract, RelayError> {
    Contract::load(json_abi).map_err(|err| err_custom_create!("Failed to load contract abi {err}"))
}

pub fn contract_encode(
    contract: &Contract,
    func: &str,
    params: &[Token],
) -> Result<Vec<u8>, web3::ethabi::Error> {
    contract
        .function(func)
        .and_then(|function| function.encode_input(params))
}

/// Arguments of `permit(owner, spender, value, deadline, v, r, s)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitArgs {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub deadline: U256,
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

pub fn encode_erc20_permit(args: &PermitArgs) -> Result<Vec<u8>, web3::ethabi::Error> {
    contract_encode(
        &ERC20_PERMIT_ABI,
        "permit",
        &[
            Token::Address(args.owner),
            Token::Address(args.spender),
            Token::Uint(args.value),
            Token::Uint(args.deadline),
            Token::Uint(U256::from(args.v)),
            Token::FixedBytes(args.r.to_vec()),
            Token::FixedBytes(args.s.to_vec()),
        ],
    )
}

pub fn encode_erc20_transfer_from(
    from: Address,
    to: Address,
    amount: U256,
) -> Result<Vec<u8>, web3::ethabi::Error> {
    contract_encode(
        &ERC20_PERMIT_ABI,
        "transferFrom",
        &[
            Token::Address(from),
            Token::Address(to),
            Token::Uint(amount),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_encode_transfer_from() {
        let from = Address::from_str("0x1111111111111111111111111111111111111111").unwrap();
        let to = Address::from_str("0x2222222222222222222222222222222222222222").unwrap();
        let data = encode_erc20_transfer_from(from, to, U256::from(1000)).unwrap();
        assert_eq!(data.len(), 4 + 3 * 32);
        assert_eq!(hex::encode(&data[0..4]), "23b872dd");
        assert_eq!(&data[16..36], from.as_bytes());
        assert_eq!(&data[48..68], to.as_bytes());
        assert_eq!(U256::from_big_endian(&data[68..100]), U256::from(1000));
    }

    #[test]
    fn test_encode_permit() {
        let args = PermitArgs {
            owner: Address::from_str("0x1111111111111111111111111111111111111111").unwrap(),
            spender: Address::from_str("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap(),
            value: U256::from(5_000_000u64),
            deadline: U256::from(1_900_000_000u64),
            v: 27,
            r: [0xaa; 32],
            s: [0xbb; 32],
        };
        let data = encode_erc20_permit(&args).unwrap();
        assert_eq!(data.len(), 4 + 7 * 32);
        assert_eq!(hex::encode(&data[0..4]), "d505accf");
        assert_eq!(data[4 + 5 * 32 - 1], 27);
        assert_eq!(&data[4 + 5 * 32..4 + 6 * 32], &[0xaa; 32]);
        assert_eq!(&data[4 + 6 * 32..], &[0xbb; 32]);
    }
}
