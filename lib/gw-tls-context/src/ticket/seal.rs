/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::cell::RefCell;

use openssl::cipher_ctx::CipherCtx;
use openssl::error::ErrorStack;
use openssl::hmac::HMacCtx;

use super::{
    SessionTicketKeyring, TICKET_AES_IV_LENGTH, TICKET_KEY_NAME_LENGTH, TicketDecryptStatus,
};
use crate::TicketKeyError;

const SHA256_DIGEST_LENGTH: usize = 32;
const AES_BLOCK_SIZE: usize = 16;

thread_local! {
    static SEAL_CONTEXT: RefCell<Option<SealContext>> = const { RefCell::new(None) };
}

struct SealContext {
    cipher: CipherCtx,
    hmac: HMacCtx,
}

impl SealContext {
    fn new() -> Result<Self, ErrorStack> {
        let cipher = CipherCtx::new()?;
        let hmac = HMacCtx::new()?;
        Ok(SealContext { cipher, hmac })
    }
}

fn with_seal_context<T, F>(f: F) -> Result<T, TicketKeyError>
where
    F: FnOnce(&mut SealContext) -> Result<T, TicketKeyError>,
{
    SEAL_CONTEXT.with_borrow_mut(|slot| {
        let ctx = match slot {
            Some(ctx) => ctx,
            None => slot.insert(SealContext::new()?),
        };
        ctx.cipher.reset()?;
        ctx.hmac.reset()?;
        f(ctx)
    })
}

impl SessionTicketKeyring {
    /// Seal `message` into a ticket under the active key.
    ///
    /// The ticket layout is `name || iv || ciphertext || hmac`, the HMAC
    /// covering everything before it.
    pub fn seal(&self, message: &[u8]) -> Result<Vec<u8>, TicketKeyError> {
        let mut output = vec![0u8; TICKET_KEY_NAME_LENGTH + TICKET_AES_IV_LENGTH];

        with_seal_context(|ctx| {
            let (key_name, iv) = output.split_at_mut(TICKET_KEY_NAME_LENGTH);
            self.encrypt_init(key_name, iv, &mut ctx.cipher, &mut ctx.hmac)?;
            ctx.cipher.set_padding(true);

            output.reserve(message.len() + AES_BLOCK_SIZE + SHA256_DIGEST_LENGTH);
            ctx.cipher.cipher_update_vec(message, &mut output)?;
            ctx.cipher.cipher_final_vec(&mut output)?;

            ctx.hmac.hmac_update(&output)?;
            ctx.hmac.hmac_final_to_vec(&mut output)?;
            Ok(())
        })?;

        Ok(output)
    }

    /// Open a ticket produced by [`Self::seal`], possibly under an older key.
    ///
    /// Returns `None` if no key matches or the ticket fails authentication.
    pub fn open(
        &self,
        ticket: &[u8],
    ) -> Result<Option<(Vec<u8>, TicketDecryptStatus)>, TicketKeyError> {
        let Some((key_name, left)) = ticket.split_at_checked(TICKET_KEY_NAME_LENGTH) else {
            return Ok(None);
        };
        let Some((iv, left)) = left.split_at_checked(TICKET_AES_IV_LENGTH) else {
            return Ok(None);
        };
        let Some(encrypted_len) = left.len().checked_sub(SHA256_DIGEST_LENGTH) else {
            return Ok(None);
        };
        let (encrypted, hmac_tag) = left.split_at(encrypted_len);
        let authenticated = &ticket[..ticket.len() - SHA256_DIGEST_LENGTH];

        with_seal_context(|ctx| {
            let status = self.decrypt_init(key_name, iv, &mut ctx.cipher, &mut ctx.hmac)?;
            if status == TicketDecryptStatus::NotFound {
                return Ok(None);
            }

            ctx.hmac.hmac_update(authenticated)?;
            let mut tag = [0u8; SHA256_DIGEST_LENGTH];
            ctx.hmac.hmac_final(&mut tag)?;
            if openssl::memcmp::eq(hmac_tag, &tag) {
                let mut message = Vec::with_capacity(encrypted.len());
                ctx.cipher.cipher_update_vec(encrypted, &mut message)?;
                ctx.cipher.cipher_final_vec(&mut message)?;
                Ok(Some((message, status)))
            } else {
                Ok(None)
            }
        })
    }
}
