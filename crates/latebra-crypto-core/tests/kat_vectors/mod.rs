mod blake3;
mod scrypt;
