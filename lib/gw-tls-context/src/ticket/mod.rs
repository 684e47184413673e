/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use log::warn;
use openssl::cipher::Cipher;
use openssl::cipher_ctx::CipherCtxRef;
use openssl::error::ErrorStack;
use openssl::hmac::HMacCtxRef;
use openssl::md::Md;
use openssl::rand;
use openssl::ssl::TicketKeyStatus;

use crate::TicketKeyError;

mod seal;

const TICKET_KEY_NAME_LENGTH: usize = 16;
const TICKET_HMAC_KEY_LENGTH: usize = 32;
const TICKET_AES_KEY_LENGTH: usize = 32;
const TICKET_AES_IV_LENGTH: usize = 16;

/// Length of a session ticket key blob: name, HMAC key and AES key.
pub const SESSION_TICKET_KEY_LENGTH: usize =
    TICKET_KEY_NAME_LENGTH + TICKET_HMAC_KEY_LENGTH + TICKET_AES_KEY_LENGTH;

#[derive(Clone, PartialEq, Eq)]
pub struct SessionTicketKey {
    name: [u8; TICKET_KEY_NAME_LENGTH],
    hmac_key: [u8; TICKET_HMAC_KEY_LENGTH],
    aes_key: [u8; TICKET_AES_KEY_LENGTH],
}

impl SessionTicketKey {
    /// Split a blob of exactly [`SESSION_TICKET_KEY_LENGTH`] bytes.
    ///
    /// Returns `None` if the length doesn't match.
    pub fn from_blob(blob: &[u8]) -> Option<Self> {
        if blob.len() != SESSION_TICKET_KEY_LENGTH {
            return None;
        }

        let (name, left) = blob.split_at(TICKET_KEY_NAME_LENGTH);
        let (hmac_key, aes_key) = left.split_at(TICKET_HMAC_KEY_LENGTH);

        let mut key = SessionTicketKey {
            name: [0u8; TICKET_KEY_NAME_LENGTH],
            hmac_key: [0u8; TICKET_HMAC_KEY_LENGTH],
            aes_key: [0u8; TICKET_AES_KEY_LENGTH],
        };
        key.name.copy_from_slice(name);
        key.hmac_key.copy_from_slice(hmac_key);
        key.aes_key.copy_from_slice(aes_key);
        Some(key)
    }

    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    #[inline]
    pub fn hmac_key(&self) -> &[u8] {
        &self.hmac_key
    }

    #[inline]
    pub fn aes_key(&self) -> &[u8] {
        &self.aes_key
    }

    fn encrypt_init(
        &self,
        iv: &mut [u8],
        cipher_ctx: &mut CipherCtxRef,
        hmac_ctx: &mut HMacCtxRef,
    ) -> Result<(), ErrorStack> {
        rand::rand_bytes(iv)?;
        cipher_ctx.encrypt_init(Some(Cipher::aes_256_cbc()), Some(&self.aes_key), Some(iv))?;
        hmac_ctx.init_ex(Some(&self.hmac_key), Md::sha256())?;
        Ok(())
    }

    fn decrypt_init(
        &self,
        iv: &[u8],
        cipher_ctx: &mut CipherCtxRef,
        hmac_ctx: &mut HMacCtxRef,
    ) -> Result<(), ErrorStack> {
        hmac_ctx.init_ex(Some(&self.hmac_key), Md::sha256())?;
        cipher_ctx.decrypt_init(Some(Cipher::aes_256_cbc()), Some(&self.aes_key), Some(iv))?;
        Ok(())
    }
}

impl fmt::Debug for SessionTicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTicketKey")
            .field("name", &hex::encode(self.name))
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketDecryptStatus {
    /// No key with the presented name, do a full handshake.
    NotFound,
    /// Decrypted with the active key.
    RenewNotNeeded,
    /// Decrypted with an older key, a new ticket should be issued.
    RenewNeeded,
}

impl From<TicketDecryptStatus> for TicketKeyStatus {
    fn from(value: TicketDecryptStatus) -> Self {
        match value {
            TicketDecryptStatus::NotFound => TicketKeyStatus::FAILED,
            TicketDecryptStatus::RenewNotNeeded => TicketKeyStatus::SUCCESS,
            TicketDecryptStatus::RenewNeeded => TicketKeyStatus::SUCCESS_AND_RENEW,
        }
    }
}

/// Ordered session ticket keys. The first one encrypts new tickets, all of
/// them can decrypt.
#[derive(Debug, Default)]
pub struct SessionTicketKeyring {
    keys: Vec<SessionTicketKey>,
}

impl SessionTicketKeyring {
    pub fn new<T: AsRef<[u8]>>(blobs: &[T]) -> Result<Self, TicketKeyError> {
        let mut keys = Vec::with_capacity(blobs.len());
        for (index, blob) in blobs.iter().enumerate() {
            let blob = blob.as_ref();
            let key =
                SessionTicketKey::from_blob(blob).ok_or(TicketKeyError::InvalidLength {
                    index,
                    length: blob.len(),
                    expected: SESSION_TICKET_KEY_LENGTH,
                })?;
            keys.push(key);
        }
        Ok(SessionTicketKeyring { keys })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn keys(&self) -> &[SessionTicketKey] {
        &self.keys
    }

    #[inline]
    pub fn active_key(&self) -> Option<&SessionTicketKey> {
        self.keys.first()
    }

    /// Find the key by name, and tell whether it is the active one.
    fn find(&self, key_name: &[u8]) -> Option<(&SessionTicketKey, bool)> {
        self.keys
            .iter()
            .enumerate()
            .find(|(_, key)| key.name() == key_name)
            .map(|(i, key)| (key, i == 0))
    }

    /// Prepare the contexts for a new ticket under the active key.
    ///
    /// The key name is written to `key_name` and a random IV to `iv`.
    pub fn encrypt_init(
        &self,
        key_name: &mut [u8],
        iv: &mut [u8],
        cipher_ctx: &mut CipherCtxRef,
        hmac_ctx: &mut HMacCtxRef,
    ) -> Result<(), TicketKeyError> {
        let key = self.active_key().ok_or(TicketKeyError::EmptyKeyring)?;
        if key_name.len() != TICKET_KEY_NAME_LENGTH {
            return Err(TicketKeyError::InvalidNameBuffer(key_name.len()));
        }
        key_name.copy_from_slice(key.name());

        let iv_len = Cipher::aes_256_cbc().iv_length();
        let iv_buf_len = iv.len();
        let iv = iv
            .get_mut(..iv_len)
            .ok_or(TicketKeyError::InvalidIvBuffer(iv_buf_len))?;
        key.encrypt_init(iv, cipher_ctx, hmac_ctx)?;
        Ok(())
    }

    /// Prepare the contexts to open a presented ticket.
    pub fn decrypt_init(
        &self,
        key_name: &[u8],
        iv: &[u8],
        cipher_ctx: &mut CipherCtxRef,
        hmac_ctx: &mut HMacCtxRef,
    ) -> Result<TicketDecryptStatus, TicketKeyError> {
        let Some((key, is_active)) = self.find(key_name) else {
            return Ok(TicketDecryptStatus::NotFound);
        };

        key.decrypt_init(iv, cipher_ctx, hmac_ctx)?;
        if is_active {
            Ok(TicketDecryptStatus::RenewNotNeeded)
        } else {
            Ok(TicketDecryptStatus::RenewNeeded)
        }
    }

    /// Entry point for the engine ticket key callback.
    ///
    /// Failures are logged and reported as `FAILED`, so the engine falls back
    /// to a full handshake.
    pub(crate) fn process(
        &self,
        key_name: &mut [u8],
        iv: &mut [u8],
        cipher_ctx: &mut CipherCtxRef,
        hmac_ctx: &mut HMacCtxRef,
        encrypt: bool,
    ) -> TicketKeyStatus {
        if encrypt {
            match self.encrypt_init(key_name, iv, cipher_ctx, hmac_ctx) {
                Ok(_) => TicketKeyStatus::SUCCESS,
                Err(e) => {
                    warn!("failed to init session ticket encryption: {e}");
                    TicketKeyStatus::FAILED
                }
            }
        } else {
            match self.decrypt_init(key_name, iv, cipher_ctx, hmac_ctx) {
                Ok(status) => status.into(),
                Err(e) => {
                    warn!("failed to init session ticket decryption: {e}");
                    TicketKeyStatus::FAILED
                }
            }
        }
    }
}
