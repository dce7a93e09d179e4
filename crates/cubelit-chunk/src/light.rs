/// Packed light byte: sky level in the high nibble, block level in the low nibble.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Light(pub u8);

impl Light {
    pub const DARK: Light = Light(0x00);
    pub const FULL_SKY: Light = Light(0xF0);
    pub const MAX: Light = Light(0xFF);

    /// Levels above 15 saturate.
    #[inline]
    pub fn new(sky: u8, block: u8) -> Light {
        Light((sky.min(15) << 4) | block.min(15))
    }

    #[inline]
    pub fn sky(self) -> u8 {
        self.0 >> 4
    }

    #[inline]
    pub fn block(self) -> u8 {
        self.0 & 0x0F
    }

    /// Brightest of the two channels.
    #[inline]
    pub fn level(self) -> u8 {
        self.sky().max(self.block())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibbles() {
        let l = Light::new(12, 3);
        assert_eq!(l.0, 0xC3);
        assert_eq!((l.sky(), l.block()), (12, 3));
        assert_eq!(l.level(), 12);
        assert_eq!(Light::new(99, 99), Light::MAX);
    }
}
