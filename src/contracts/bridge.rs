//! Bridge contract ABI definitions
//!
//! Uses alloy's sol! macro to generate the events the warden watches and the
//! calls it relays. Only the warden-facing surface is declared.

use alloy::sol;

sol! {
    /// Contract on the source chain: locks underlying tokens, releases them on `withdraw`
    interface ISourceBridge {
        /// Emitted when a user locks `amount` of `token` for `recipient` on the destination chain
        event Deposit(address token, address recipient, uint256 amount);

        /// Release locked tokens after an Unwrap on the destination chain (warden only)
        function withdraw(address underlying_token, address recipient, uint256 amount) external;
    }
}

sol! {
    /// Contract on the destination chain: mints and burns wrapped tokens
    interface IDestinationBridge {
        /// Emitted when `frm` burns `amount` of `wrapped_token` to release
        /// `underlying_token` to `to`
        event Unwrap(
            address underlying_token,
            address wrapped_token,
            address frm,
            address to,
            uint256 amount
        );

        /// Mint the wrapped counterpart of `token` to `recipient` (warden only)
        function wrap(address token, address recipient, uint256 amount) external;
    }
}
