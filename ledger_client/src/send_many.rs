//! §6.5: the send-many reference procedure payload — a fixed 1000-byte
//! buffer of 25 destination/amount slots, zero-filled for unused slots.

use ledger_core::errors::ValidationError;

pub const SEND_MANY_MAX_TRANSFERS: usize = 25;
pub const SEND_MANY_PAYLOAD_SIZE: usize = 1000;
const AMOUNTS_OFFSET: usize = 800;

#[derive(Debug, Clone, Copy)]
pub struct SendManyTransfer {
    pub destination_public_key: [u8; 32],
    pub amount: i64,
}

/// Encodes up to 25 transfers into the fixed 1000-byte send-many buffer: 32-byte
/// destination public keys starting at offset 0, followed by signed 64-bit
/// little-endian amounts starting at offset 800. Rejects more than 25 transfers.
pub fn encode_send_many(transfers: &[SendManyTransfer]) -> Result<Vec<u8>, ValidationError> {
    if transfers.len() > SEND_MANY_MAX_TRANSFERS {
        return Err(ValidationError::SendManyTooLong {
            count: transfers.len(),
            max: SEND_MANY_MAX_TRANSFERS,
        });
    }

    let mut buffer = vec![0u8; SEND_MANY_PAYLOAD_SIZE];
    for (slot, transfer) in transfers.iter().enumerate() {
        let key_offset = slot * 32;
        buffer[key_offset..key_offset + 32].copy_from_slice(&transfer.destination_public_key);

        let amount_offset = AMOUNTS_OFFSET + slot * 8;
        buffer[amount_offset..amount_offset + 8]
            .copy_from_slice(&transfer.amount.to_le_bytes());
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_all_zero() {
        let buffer = encode_send_many(&[]).unwrap();
        assert_eq!(buffer.len(), SEND_MANY_PAYLOAD_SIZE);
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn places_keys_and_amounts_at_fixed_offsets() {
        let mut destination = [0u8; 32];
        destination[0] = 0xAB;
        let transfers = vec![SendManyTransfer {
            destination_public_key: destination,
            amount: 42,
        }];
        let buffer = encode_send_many(&transfers).unwrap();
        assert_eq!(&buffer[0..32], &destination[..]);
        assert_eq!(&buffer[800..808], &42i64.to_le_bytes());
    }

    #[test]
    fn rejects_more_than_twenty_five_transfers() {
        let transfers = vec![
            SendManyTransfer {
                destination_public_key: [0u8; 32],
                amount: 1,
            };
            26
        ];
        let err = encode_send_many(&transfers).unwrap_err();
        assert!(matches!(err, ValidationError::SendManyTooLong { count: 26, max: 25 }));
    }
}
