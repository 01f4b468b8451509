use super::errors::CheckoutError;
use super::model::CustomerInfo;
use crate::domain::shared::value_objects::{EmailAddress, PhoneNumber};

/// Checks the details collected on the customer-info step.
pub fn validate_customer(customer: &CustomerInfo) -> Result<(), CheckoutError> {
    if customer.name.trim().is_empty() {
        return Err(CheckoutError::NameRequired);
    }
    if EmailAddress::parse(&customer.email).is_none() {
        return Err(CheckoutError::InvalidEmail);
    }
    if PhoneNumber::parse(&customer.phone_number).is_none() {
        return Err(CheckoutError::InvalidPhoneNumber);
    }
    if !customer.delivery_address.is_resolved() {
        return Err(CheckoutError::AddressUnresolved);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkout::model::DeliveryAddress;

    fn valid() -> CustomerInfo {
        CustomerInfo {
            name: "Achieng Otieno".to_string(),
            email: "achieng@example.com".to_string(),
            phone_number: "0722000111".to_string(),
            delivery_address: DeliveryAddress {
                street: "Kenyatta Avenue 4".to_string(),
                town: "Kisumu".to_string(),
                ..DeliveryAddress::default()
            },
        }
    }

    #[test]
    fn should_accept_complete_customer() {
        assert!(validate_customer(&valid()).is_ok());
    }

    #[test]
    fn should_reject_blank_name() {
        let customer = CustomerInfo {
            name: "  ".to_string(),
            ..valid()
        };
        assert_eq!(validate_customer(&customer), Err(CheckoutError::NameRequired));
    }

    #[test]
    fn should_reject_bad_email_and_phone() {
        let bad_email = CustomerInfo {
            email: "achieng@".to_string(),
            ..valid()
        };
        let bad_phone = CustomerInfo {
            phone_number: "0812000111".to_string(),
            ..valid()
        };

        assert_eq!(validate_customer(&bad_email), Err(CheckoutError::InvalidEmail));
        assert_eq!(
            validate_customer(&bad_phone),
            Err(CheckoutError::InvalidPhoneNumber)
        );
    }

    #[test]
    fn should_require_street_and_town() {
        let customer = CustomerInfo {
            delivery_address: DeliveryAddress {
                street: "Kenyatta Avenue 4".to_string(),
                ..DeliveryAddress::default()
            },
            ..valid()
        };
        assert_eq!(
            validate_customer(&customer),
            Err(CheckoutError::AddressUnresolved)
        );
    }
}
