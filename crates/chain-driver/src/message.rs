//! Solana 레거시 트랜잭션 직렬화 (시스템 프로그램 전송 한 건)
//!
//! ```text
//! transaction = compact_u16(서명 수) || 서명(64B)* || message
//! message     = header(3B) || compact_u16(계정 수) || 계정 키(32B)*
//!               || recent_blockhash(32B) || compact_u16(명령 수) || 명령*
//! instruction = program_id_index(1B) || compact_u16(계정 수) || 계정 인덱스*
//!               || compact_u16(데이터 길이) || 데이터
//! ```

use ed25519_dalek::{Signer, SigningKey};

/// 시스템 프로그램 ID (`11111111111111111111111111111111`)
const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];
/// 시스템 프로그램 `Transfer` 명령 번호
const SYSTEM_TRANSFER_INSTRUCTION: u32 = 2;

/// compact-u16 (7비트 단위 가변 길이) 인코딩
pub fn encode_compact_u16(mut value: u16, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// `from`에서 `to`로 `lamports`를 옮기는 메시지를 만듭니다.
///
/// 계정 순서: `[from (서명자, 쓰기), to (쓰기), system program (읽기 전용)]`
pub fn transfer_message(
    from: &[u8; 32],
    to: &[u8; 32],
    lamports: u64,
    recent_blockhash: &[u8; 32],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(160);

    // header: 서명 필요 1, 읽기 전용 서명자 0, 읽기 전용 비서명자 1
    message.extend_from_slice(&[1, 0, 1]);

    encode_compact_u16(3, &mut message);
    message.extend_from_slice(from);
    message.extend_from_slice(to);
    message.extend_from_slice(&SYSTEM_PROGRAM_ID);

    message.extend_from_slice(recent_blockhash);

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_INSTRUCTION.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    encode_compact_u16(1, &mut message);
    message.push(2);
    encode_compact_u16(2, &mut message);
    message.extend_from_slice(&[0, 1]);
    encode_compact_u16(data.len() as u16, &mut message);
    message.extend_from_slice(&data);

    message
}

/// 메시지에 서명하고 직렬화된 트랜잭션과 서명(base58, 트랜잭션 식별자)을 반환합니다.
pub fn sign_transaction(signer: &SigningKey, message: &[u8]) -> (Vec<u8>, String) {
    let signature = signer.sign(message).to_bytes();
    let mut tx = Vec::with_capacity(1 + signature.len() + message.len());
    encode_compact_u16(1, &mut tx);
    tx.extend_from_slice(&signature);
    tx.extend_from_slice(message);
    (tx, bs58::encode(signature).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn compact(value: u16) -> Vec<u8> {
        let mut out = Vec::new();
        encode_compact_u16(value, &mut out);
        out
    }

    #[test]
    fn compact_u16_known_vectors() {
        assert_eq!(compact(0), vec![0x00]);
        assert_eq!(compact(0x7f), vec![0x7f]);
        assert_eq!(compact(0x80), vec![0x80, 0x01]);
        assert_eq!(compact(0x3fff), vec![0xff, 0x7f]);
        assert_eq!(compact(0x4000), vec![0x80, 0x80, 0x01]);
        assert_eq!(compact(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn transfer_message_layout() {
        let from = [1u8; 32];
        let to = [2u8; 32];
        let blockhash = [9u8; 32];
        let message = transfer_message(&from, &to, 1_000_000_000, &blockhash);

        assert_eq!(&message[..3], &[1, 0, 1]);
        assert_eq!(message[3], 3);
        assert_eq!(&message[4..36], &from);
        assert_eq!(&message[36..68], &to);
        assert_eq!(&message[68..100], &SYSTEM_PROGRAM_ID);
        assert_eq!(&message[100..132], &blockhash);
        // 명령 수, program index, 계정 수, 계정 인덱스, 데이터 길이
        assert_eq!(&message[132..138], &[1, 2, 2, 0, 1, 12]);
        assert_eq!(&message[138..142], &2u32.to_le_bytes());
        assert_eq!(&message[142..150], &1_000_000_000u64.to_le_bytes());
        assert_eq!(message.len(), 150);
    }

    #[test]
    fn signed_transaction_verifies() {
        let signer = SigningKey::from_bytes(&[7u8; 32]);
        let from = signer.verifying_key().to_bytes();
        let message = transfer_message(&from, &[3u8; 32], 5, &[4u8; 32]);
        let (tx, id) = sign_transaction(&signer, &message);

        assert_eq!(tx[0], 1);
        assert_eq!(&tx[65..], message.as_slice());

        let sig_bytes: [u8; 64] = tx[1..65].try_into().unwrap();
        let signature = Signature::from_bytes(&sig_bytes);
        signer.verifying_key().verify(&message, &signature).unwrap();
        assert_eq!(bs58::decode(&id).into_vec().unwrap(), sig_bytes.to_vec());
    }
}
