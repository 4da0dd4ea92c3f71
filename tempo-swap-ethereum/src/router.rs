//! Bindings for the UniswapV2-style router the swap and liquidity actions call into.

use alloy::{
    primitives::{Address, U256},
    sol,
    sol_types::SolCall,
};

use crate::RPCError;

sol! {
    function addLiquidity(
        address tokenA,
        address tokenB,
        uint256 amountADesired,
        uint256 amountBDesired,
        uint256 amountAMin,
        uint256 amountBMin,
        address to,
        uint256 deadline
    ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);

    function addLiquidityETH(
        address token,
        uint256 amountTokenDesired,
        uint256 amountTokenMin,
        uint256 amountETHMin,
        address to,
        uint256 deadline
    ) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);

    function swapExactTokensForTokens(
        uint256 amountIn,
        uint256 amountOutMin,
        address[] path,
        address to,
        uint256 deadline
    ) external returns (uint256[] amounts);

    function swapExactETHForTokens(
        uint256 amountOutMin,
        address[] path,
        address to,
        uint256 deadline
    ) external payable returns (uint256[] amounts);

    function swapExactTokensForETH(
        uint256 amountIn,
        uint256 amountOutMin,
        address[] path,
        address to,
        uint256 deadline
    ) external returns (uint256[] amounts);

    function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts);
}

/// Arguments of `swapExactTokensForTokens`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactInputSwap {
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub to: Address,
    pub deadline: U256,
}

/// Arguments of `addLiquidity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: U256,
}

pub fn encode_swap_exact_tokens_for_tokens(swap: &ExactInputSwap) -> Vec<u8> {
    swapExactTokensForTokensCall {
        amountIn: swap.amount_in,
        amountOutMin: swap.amount_out_min,
        path: swap.path.clone(),
        to: swap.to,
        deadline: swap.deadline,
    }
    .abi_encode()
}

pub fn encode_add_liquidity(params: &AddLiquidity) -> Vec<u8> {
    addLiquidityCall {
        tokenA: params.token_a,
        tokenB: params.token_b,
        amountADesired: params.amount_a_desired,
        amountBDesired: params.amount_b_desired,
        amountAMin: params.amount_a_min,
        amountBMin: params.amount_b_min,
        to: params.to,
        deadline: params.deadline,
    }
    .abi_encode()
}

/// Encode getAmountsOut(uint256,address[]) call
pub fn encode_get_amounts_out(amount_in: U256, path: Vec<Address>) -> Vec<u8> {
    getAmountsOutCall { amountIn: amount_in, path }.abi_encode()
}

/// Decode getAmountsOut(uint256,address[]) return value
pub fn decode_get_amounts_out(data: &[u8]) -> Result<Vec<U256>, RPCError> {
    getAmountsOutCall::abi_decode_returns(data).map_err(|e| RPCError::decode("getAmountsOut()", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_encoding_round_trips_through_decoder() {
        let swap = ExactInputSwap {
            amount_in: U256::from(1_000u64),
            amount_out_min: U256::ZERO,
            path: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            to: Address::repeat_byte(3),
            deadline: U256::from(9_999_999_999u64),
        };

        let calldata = encode_swap_exact_tokens_for_tokens(&swap);
        let decoded = swapExactTokensForTokensCall::abi_decode(&calldata).unwrap();

        assert_eq!(decoded.amountIn, swap.amount_in);
        assert_eq!(decoded.amountOutMin, U256::ZERO);
        assert_eq!(decoded.path, swap.path);
        assert_eq!(decoded.deadline, U256::from(9_999_999_999u64));
    }

    #[test]
    fn test_add_liquidity_selector() {
        let params = AddLiquidity {
            token_a: Address::repeat_byte(1),
            token_b: Address::repeat_byte(2),
            amount_a_desired: U256::from(5u8),
            amount_b_desired: U256::from(7u8),
            amount_a_min: U256::ZERO,
            amount_b_min: U256::ZERO,
            to: Address::repeat_byte(3),
            deadline: U256::from(9_999_999_999u64),
        };

        let calldata = encode_add_liquidity(&params);
        // addLiquidity(address,address,uint256,uint256,uint256,uint256,address,uint256)
        assert_eq!(calldata[..4], [0xe8, 0xe3, 0x37, 0x00]);
        assert_eq!(calldata.len(), 4 + 8 * 32);
    }
}
