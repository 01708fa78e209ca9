//! 56800E instructions the driver feeds to the core through OPDBR.

use std::ops::Deref;

/// Where the operands of an instruction go in its encoding.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    None,
    /// 24 bit immediate, low half in the second word, high half in the third.
    Long,
    /// 16 bit immediate in the second word.
    Word,
    /// Address displacement in the second word.
    Displacement,
    /// 16 bit immediate in the second word, displacement in the third.
    WordAndDisplacement,
}

impl Operand {
    pub fn word_count(self) -> usize {
        match self {
            Operand::None => 1,
            Operand::Word | Operand::Displacement => 2,
            Operand::Long | Operand::WordAndDisplacement => 3,
        }
    }
}

/// Encoding of one table entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Encoding {
    pub mnemonic: &'static str,
    pub opcode: u16,
    pub operand: Operand,
}

macro_rules! instructions {
    ($($(#[$meta:meta])* $name:ident => $mnemonic:literal, $opcode:literal, $operand:ident;)*) => {
        /// Instructions used to move data between the core and the EOnCE bridge.
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        pub enum CoreInstruction {
            $($(#[$meta])* $name,)*
        }

        impl CoreInstruction {
            pub const ALL: &'static [CoreInstruction] = &[$(CoreInstruction::$name,)*];

            pub const fn encoding(self) -> Encoding {
                match self {
                    $(CoreInstruction::$name => Encoding {
                        mnemonic: $mnemonic,
                        opcode: $opcode,
                        operand: Operand::$operand,
                    },)*
                }
            }
        }
    };
}

instructions! {
    MoveLongToR0 => "move.l #<+aa>,r0", 0xE418, Long;
    MoveLongToR2 => "move.l #<+aa>,r2", 0xE41A, Long;
    MoveLongToR3 => "move.l #<+aa>,r3", 0xE41B, Long;
    /// Loads y0 with the low and y1 with the high half.
    MoveLongToY => "move.l #<+aa>,y", 0xE417, Long;
    MoveLongToPc => "move.l #<+aa>,pc", 0xE71E, Long;

    MoveXR0ToY0 => "move.w x:(r0),y0", 0xF514, None;
    MoveXR0ToY1 => "move.w x:(r0),y1", 0xF714, None;
    MoveXR0IncToY0 => "move.w x:(r0)+,y0", 0xF500, None;
    MovePR0IncToY0 => "move.w p:(r0)+,y0", 0x8568, None;
    MovePR0IncToY1 => "move.w p:(r0)+,y1", 0x8768, None;
    MoveXR2ToY0 => "move.w x:(r2),y0", 0xF516, None;
    MoveXR2DispToY0 => "move.w x:(r2+xx),y0", 0xF542, Displacement;

    MoveY0ToXR0 => "move.w y0,x:(r0)", 0xD514, None;
    MoveY0ToXR0Inc => "move.w y0,x:(r0)+", 0xD500, None;
    MoveY0ToPR0Inc => "move.w y0,p:(r0)+", 0x8560, None;
    MoveY0ToXR3 => "move.w y0,x:(r3)", 0xD503, None;
    MoveY0ToPR3Inc => "move.w y0,p:(r3)+", 0x8563, None;
    MoveY1ToXR0 => "move.w y1,x:(r0)", 0xD714, None;
    MoveY1ToXR0Inc => "move.w y1,x:(r0)+", 0xD700, None;
    MoveY1ToPR0Inc => "move.w y1,p:(r0)+", 0x8760, None;

    MoveImmToY0 => "move.w #xxxx,y0", 0x8745, Word;
    MoveImmToXR0 => "move.w #xxxx,x:(r0)", 0x8640, Word;
    MoveImmToXR2 => "move.w #xxxx,x:(r2)", 0x8642, Word;
    MoveImmToXR2Disp => "move.w #xxxx,x:(r2+xx)", 0x8646, WordAndDisplacement;

    MovePcToR4 => "move.l pc,r4", 0xE716, None;
    /// Copies r4 to y, low half to y0.
    MoveR4ToY => "move.l r4,y", 0xE764, None;
}

/// An encoded instruction, one to three words long.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Assembled {
    words: [u16; 3],
    len: usize,
}

impl Deref for Assembled {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        &self.words[..self.len]
    }
}

impl CoreInstruction {
    /// Splice `value` and `displacement` into the encoding. Operands the
    /// instruction does not take are ignored.
    pub fn assemble(self, value: u32, displacement: u16) -> Assembled {
        let encoding = self.encoding();
        let low = (value & 0xFFFF) as u16;
        let high = ((value >> 16) & 0xFFFF) as u16;

        let words = match encoding.operand {
            Operand::None => [encoding.opcode, 0, 0],
            Operand::Long => [encoding.opcode, low, high],
            Operand::Word => [encoding.opcode, low, 0],
            Operand::Displacement => [encoding.opcode, displacement, 0],
            Operand::WordAndDisplacement => [encoding.opcode, low, displacement],
        };

        Assembled {
            words,
            len: encoding.operand.word_count(),
        }
    }

    pub fn from_opcode(opcode: u16) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|instruction| instruction.encoding().opcode == opcode)
    }
}
