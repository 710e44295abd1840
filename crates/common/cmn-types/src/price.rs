/// Integer price in the ledger's atomic unit, 10^-18 of a whole token.
pub type TokenAmount = u128;

/// Atomic units per whole token (18 fractional decimal digits).
pub const ATTO_PER_TOKEN: TokenAmount = 1_000_000_000_000_000_000;

/// Whole tokens expressed in atomic units.
pub fn tokens(n: u64) -> TokenAmount {
    n as TokenAmount * ATTO_PER_TOKEN
}

/// Thousandths of a token expressed in atomic units.
pub fn milli_tokens(n: u64) -> TokenAmount {
    n as TokenAmount * (ATTO_PER_TOKEN / 1_000)
}
