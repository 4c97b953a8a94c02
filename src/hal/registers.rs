use embedded_hal::i2c::I2c;

use crate::{Error, Result};

/// 16-bit big-endian register access on one I2C device.
pub struct I2cRegisters<I2C> {
    bus: I2C,
    addr: u8,
    chip: &'static str,
}

impl<I2C: I2c> I2cRegisters<I2C> {
    pub fn new(bus: I2C, addr: u8, chip: &'static str) -> Self {
        Self { bus, addr, chip }
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    pub fn read_u16(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.bus
            .write_read(self.addr, &[reg], &mut buf)
            .map_err(|e| self.map_err(e))?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_i16(&mut self, reg: u8) -> Result<i16> {
        self.read_u16(reg).map(|raw| raw as i16)
    }

    pub fn write_u16(&mut self, reg: u8, value: u16) -> Result<()> {
        let [hi, lo] = value.to_be_bytes();
        self.bus
            .write(self.addr, &[reg, hi, lo])
            .map_err(|e| self.map_err(e))
    }

    #[cfg(test)]
    pub fn bus(&self) -> &I2C {
        &self.bus
    }

    fn map_err(&self, err: I2C::Error) -> Error {
        Error::Hardware(format!("{}@0x{:02x}: {err:?}", self.chip, self.addr))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Register-file fake for the I2C drivers.

    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
    use std::collections::HashMap;

    #[derive(Debug)]
    pub struct FakeI2cError(pub ErrorKind);

    impl embedded_hal::i2c::Error for FakeI2cError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    /// Answers reads from a register map and records every write.
    #[derive(Default)]
    pub struct FakeI2c {
        pub present: Vec<u8>,
        pub registers: HashMap<(u8, u8), u16>,
        /// Register writes as `(addr, reg, value)`.
        pub writes: Vec<(u8, u8, u16)>,
        /// Every write payload as sent, for byte-oriented devices.
        pub raw: Vec<(u8, Vec<u8>)>,
    }

    impl FakeI2c {
        pub fn with_device(addr: u8) -> Self {
            Self {
                present: vec![addr],
                ..Self::default()
            }
        }

        pub fn set(&mut self, addr: u8, reg: u8, value: u16) {
            self.registers.insert((addr, reg), value);
        }
    }

    impl ErrorType for FakeI2c {
        type Error = FakeI2cError;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if !self.present.contains(&address) {
                return Err(FakeI2cError(ErrorKind::NoAcknowledge(
                    NoAcknowledgeSource::Address,
                )));
            }
            let mut pointer = 0u8;
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(bytes) => {
                        self.raw.push((address, bytes.to_vec()));
                        if let Some((&reg, rest)) = bytes.split_first() {
                            pointer = reg;
                            if rest.len() == 2 {
                                let value = u16::from_be_bytes([rest[0], rest[1]]);
                                self.writes.push((address, reg, value));
                                self.registers.insert((address, reg), value);
                            }
                        }
                    }
                    Operation::Read(buf) => {
                        let value = self
                            .registers
                            .get(&(address, pointer))
                            .copied()
                            .unwrap_or(0);
                        let bytes = value.to_be_bytes();
                        for (dst, src) in buf.iter_mut().zip(bytes.iter()) {
                            *dst = *src;
                        }
                    }
                }
            }
            Ok(())
        }
    }
}
