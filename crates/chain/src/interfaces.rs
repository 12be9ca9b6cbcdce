use alloy::sol_types::SolCall;

use crate::abi::{ERC20, ERC721};
use crate::types::TokenInterface;

const ERC20_SELECTORS: [[u8; 4]; 6] = [
    ERC20::totalSupplyCall::SELECTOR,
    ERC20::balanceOfCall::SELECTOR,
    ERC20::transferCall::SELECTOR,
    ERC20::transferFromCall::SELECTOR,
    ERC20::approveCall::SELECTOR,
    ERC20::allowanceCall::SELECTOR,
];

const ERC721_SELECTORS: [[u8; 4]; 7] = [
    ERC721::balanceOfCall::SELECTOR,
    ERC721::ownerOfCall::SELECTOR,
    ERC721::transferFromCall::SELECTOR,
    ERC721::approveCall::SELECTOR,
    ERC721::getApprovedCall::SELECTOR,
    ERC721::setApprovalForAllCall::SELECTOR,
    ERC721::isApprovedForAllCall::SELECTOR,
];

/// Detect which token standards a contract implements by looking for the
/// dispatcher's `PUSH4 <selector>` of every required function.
pub fn detect(bytecode: &[u8]) -> Vec<TokenInterface> {
    let mut found = Vec::new();
    if ERC20_SELECTORS.iter().all(|s| contains_selector(bytecode, s)) {
        found.push(TokenInterface::Erc20);
    }
    if ERC721_SELECTORS.iter().all(|s| contains_selector(bytecode, s)) {
        found.push(TokenInterface::Erc721);
    }
    found
}

fn contains_selector(bytecode: &[u8], selector: &[u8; 4]) -> bool {
    const PUSH4: u8 = 0x63;
    bytecode
        .windows(5)
        .any(|w| w[0] == PUSH4 && w[1..] == selector[..])
}
