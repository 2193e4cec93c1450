//! Encrypt and decrypt through the process-wide coordinator

use sealgate_domain::Result;

use crate::context::global;
use crate::utils::logging::log_operation;

fn logged<T>(operation: &str, partition_id: &str, result: Result<T>) -> Result<T> {
    log_operation(operation, Some(partition_id), &result);
    result
}

pub fn encrypt(partition_id: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    logged("encrypt", partition_id, global().encrypt(partition_id, plaintext))
}

pub fn decrypt(partition_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
    logged("decrypt", partition_id, global().decrypt(partition_id, ciphertext))
}

/// Encrypt text; the returned record is JSON text.
pub fn encrypt_string(partition_id: &str, plaintext: &str) -> Result<String> {
    logged("encrypt_string", partition_id, global().encrypt_string(partition_id, plaintext))
}

pub fn decrypt_string(partition_id: &str, record: &str) -> Result<String> {
    logged("decrypt_string", partition_id, global().decrypt_string(partition_id, record))
}

/// Decrypt a JSON record into raw bytes.
pub fn decrypt_json(partition_id: &str, record: &str) -> Result<Vec<u8>> {
    logged("decrypt_json", partition_id, global().decrypt_json(partition_id, record))
}

pub async fn encrypt_async(partition_id: &str, plaintext: Vec<u8>) -> Result<Vec<u8>> {
    let result = global().encrypt_async(partition_id, plaintext).await;
    logged("encrypt_async", partition_id, result)
}

pub async fn decrypt_async(partition_id: &str, ciphertext: Vec<u8>) -> Result<Vec<u8>> {
    let result = global().decrypt_async(partition_id, ciphertext).await;
    logged("decrypt_async", partition_id, result)
}

pub async fn encrypt_string_async(partition_id: &str, plaintext: &str) -> Result<String> {
    let result = global().encrypt_string_async(partition_id, plaintext).await;
    logged("encrypt_string_async", partition_id, result)
}

pub async fn decrypt_string_async(partition_id: &str, record: &str) -> Result<String> {
    let result = global().decrypt_string_async(partition_id, record).await;
    logged("decrypt_string_async", partition_id, result)
}
