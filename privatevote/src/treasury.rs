use crate::*;

/// Creation fee configuration and the balance of collected fees
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FeeTreasury {
    owner: Address,
    #[serde(with = "amount_string")]
    creation_fee: Amount,
    #[serde(with = "amount_string")]
    balance: Amount,
}

impl FeeTreasury {
    pub fn new(owner: Address, creation_fee: Amount) -> Self {
        FeeTreasury {
            owner,
            creation_fee,
            balance: 0,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn creation_fee(&self) -> Amount {
        self.creation_fee
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn ensure_owner(&self, caller: &Address) -> Result<(), ValidationError> {
        if *caller != self.owner {
            return Err(ValidationError::OnlyOwner);
        }
        Ok(())
    }

    /// Check that a payment covers the current creation fee
    pub fn check_payment(&self, paid: Amount) -> Result<(), ValidationError> {
        if paid < self.creation_fee {
            return Err(ValidationError::InsufficientCreationFee {
                required: self.creation_fee,
                paid,
            });
        }
        Ok(())
    }

    /// Credit a payment that already passed `check_payment`
    ///
    /// The whole payment is kept, including anything above the fee.
    pub(crate) fn credit(&mut self, paid: Amount) {
        self.balance = self.balance.saturating_add(paid);
    }

    /// Set a new creation fee, returning the old one
    pub fn set_creation_fee(
        &mut self,
        caller: &Address,
        new_fee: Amount,
    ) -> Result<Amount, ValidationError> {
        self.ensure_owner(caller)?;

        let old_fee = self.creation_fee;
        self.creation_fee = new_fee;
        Ok(old_fee)
    }

    /// Take out the entire balance
    pub fn withdraw(&mut self, caller: &Address) -> Result<Amount, ValidationError> {
        self.ensure_owner(caller)?;
        if self.balance == 0 {
            return Err(ValidationError::NoFeesToWithdraw);
        }

        let amount = self.balance;
        self.balance = 0;
        Ok(amount)
    }
}
