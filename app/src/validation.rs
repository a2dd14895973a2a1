use crate::blockchain::Address;
use crate::errors::{WalletError, WalletResult};
use regex::Regex;
use serde_json::Value;

/// Input validation for values that arrive from the browser or from HTTP clients
pub struct InputValidator {
    address_pattern: Regex,
    token_id_pattern: Regex,

    // Blacklisted patterns for security
    malicious_patterns: Vec<Regex>,
}

impl InputValidator {
    pub fn new() -> WalletResult<Self> {
        let address_pattern = Regex::new(r"^0x[a-fA-F0-9]{40}$")
            .map_err(|e| WalletError::ValidationError(format!("Invalid address regex: {}", e)))?;

        let token_id_pattern = Regex::new(r"^\d{1,20}$")
            .map_err(|e| WalletError::ValidationError(format!("Invalid token id regex: {}", e)))?;

        let malicious_patterns = [
            r"<script",
            r"javascript:",
            r"data:text/html",
            r"vbscript:",
            r"onload=",
            r"onerror=",
        ]
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .map_err(|e| WalletError::ValidationError(format!("Invalid pattern: {}", e)))
        })
        .collect::<WalletResult<Vec<_>>>()?;

        Ok(InputValidator {
            address_pattern,
            token_id_pattern,
            malicious_patterns,
        })
    }

    /// Validate and parse an account address
    pub fn validate_address(&self, address: &str) -> WalletResult<Address> {
        self.check_basic_security(address)?;

        if address.is_empty() {
            return Err(WalletError::ValidationError(
                "Address cannot be empty".to_string(),
            ));
        }

        if address.len() > 100 {
            return Err(WalletError::ValidationError("Address too long".to_string()));
        }

        if !self.address_pattern.is_match(address) {
            return Err(WalletError::InvalidAddress(
                "Address format is invalid".to_string(),
            ));
        }

        Address::from_string(address)
    }

    /// Parse a token id sent as a JSON number or numeric string.
    ///
    /// Missing, null, empty strings and the number `0` are reported as
    /// "Token ID is required". The string `"0"` is a present id.
    pub fn parse_token_id(&self, value: Option<&Value>) -> WalletResult<u64> {
        let required = || WalletError::ValidationError("Token ID is required".to_string());

        let id = match value {
            None | Some(Value::Null) => return Err(required()),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(0) => return Err(required()),
                Some(id) => id,
                None => {
                    return Err(WalletError::ValidationError(format!(
                        "Invalid token ID: {}",
                        n
                    )))
                }
            },
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(required());
                }
                self.check_basic_security(trimmed)?;
                if !self.token_id_pattern.is_match(trimmed) {
                    return Err(WalletError::ValidationError(format!(
                        "Invalid token ID: {}",
                        trimmed
                    )));
                }
                trimmed.parse::<u64>().map_err(|_| {
                    WalletError::ValidationError(format!("Invalid token ID: {}", trimmed))
                })?
            }
            Some(other) => {
                return Err(WalletError::ValidationError(format!(
                    "Invalid token ID: {}",
                    other
                )))
            }
        };

        Ok(id)
    }

    /// Validate the number of tokens requested in a single mint
    pub fn validate_mint_quantity(&self, quantity: u64, max_per_mint: u64) -> WalletResult<()> {
        if quantity == 0 {
            return Err(WalletError::ValidationError(
                "Mint quantity must be at least 1".to_string(),
            ));
        }

        if quantity > max_per_mint {
            return Err(WalletError::ValidationError(format!(
                "Mint quantity cannot exceed {}",
                max_per_mint
            )));
        }

        Ok(())
    }

    /// Check for basic security issues in any input
    fn check_basic_security(&self, input: &str) -> WalletResult<()> {
        if input.len() > 1000 {
            return Err(WalletError::ValidationError("Input too long".to_string()));
        }

        let lowered = input.to_lowercase();
        for pattern in &self.malicious_patterns {
            if pattern.is_match(&lowered) {
                return Err(WalletError::ValidationError(
                    "Input contains potentially malicious content".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> InputValidator {
        InputValidator::new().unwrap()
    }

    #[test]
    fn addresses() {
        let v = validator();
        assert!(v
            .validate_address("0x0102030405060708090a0b0c0d0e0f1011121314")
            .is_ok());
        assert!(matches!(
            v.validate_address("0x123"),
            Err(WalletError::InvalidAddress(_))
        ));
        assert!(v.validate_address("").is_err());
        assert!(v.validate_address("<script>alert(1)</script>").is_err());
    }

    #[test]
    fn token_ids_accept_numbers_and_strings() {
        let v = validator();
        assert_eq!(v.parse_token_id(Some(&json!(17))).unwrap(), 17);
        assert_eq!(v.parse_token_id(Some(&json!("17"))).unwrap(), 17);
        assert_eq!(v.parse_token_id(Some(&json!(" 9 "))).unwrap(), 9);
        assert_eq!(v.parse_token_id(Some(&json!("0"))).unwrap(), 0);
    }

    #[test]
    fn missing_token_ids_are_required() {
        let v = validator();
        for value in [None, Some(json!(null)), Some(json!("")), Some(json!(0))] {
            let err = v.parse_token_id(value.as_ref()).unwrap_err();
            assert_eq!(
                err,
                WalletError::ValidationError("Token ID is required".to_string())
            );
        }
    }

    #[test]
    fn malformed_token_ids_are_rejected() {
        let v = validator();
        assert!(v.parse_token_id(Some(&json!("12abc"))).is_err());
        assert!(v.parse_token_id(Some(&json!(-4))).is_err());
        assert!(v.parse_token_id(Some(&json!(1.5))).is_err());
        assert!(v.parse_token_id(Some(&json!([1]))).is_err());
    }

    #[test]
    fn mint_quantity_bounds() {
        let v = validator();
        assert!(v.validate_mint_quantity(1, 100).is_ok());
        assert!(v.validate_mint_quantity(100, 100).is_ok());
        assert!(v.validate_mint_quantity(0, 100).is_err());
        assert!(v.validate_mint_quantity(101, 100).is_err());
    }
}
