//! The closed set of token mutations a decipherer can run

use crate::error::CipherError;
use std::fmt;

/// Operation family recognized from a helper body.
///
/// The numeric argument is not part of the helper's source; it comes from
/// each plan step and is bound with [`OpKind::bind`] when the step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `a.reverse()`
    Reverse,
    /// `a.splice(0,b)`
    DropMiddle,
    /// `var c=a[0];a[0]=a[b%a.length];a[b]=c`
    SwapHead,
}

impl OpKind {
    /// Attach a plan step's argument
    pub fn bind(self, argument: usize) -> PrimitiveOp {
        match self {
            OpKind::Reverse => PrimitiveOp::Reverse,
            OpKind::DropMiddle => PrimitiveOp::DropMiddle(argument),
            OpKind::SwapHead => PrimitiveOp::SwapHead(argument),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpKind::Reverse => "reverse",
            OpKind::DropMiddle => "drop-middle",
            OpKind::SwapHead => "swap-head",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully resolved mutation ready to run against a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveOp {
    /// Reverse the whole token
    Reverse,
    /// Keep `[0, n)` and `[2n, len)`, dropping the `n` elements in between
    DropMiddle(usize),
    /// Exchange index 0 with index `n % len`
    SwapHead(usize),
}

impl PrimitiveOp {
    pub fn kind(&self) -> OpKind {
        match self {
            PrimitiveOp::Reverse => OpKind::Reverse,
            PrimitiveOp::DropMiddle(_) => OpKind::DropMiddle,
            PrimitiveOp::SwapHead(_) => OpKind::SwapHead,
        }
    }

    /// Run the operation on `token`.
    ///
    /// Range checks happen before anything is touched, so a failed call
    /// leaves `token` exactly as it was.
    pub fn apply(&self, token: &mut Vec<char>) -> Result<(), CipherError> {
        let len = token.len();
        match *self {
            PrimitiveOp::Reverse => token.reverse(),
            PrimitiveOp::DropMiddle(n) => {
                if n > len {
                    return Err(self.out_of_range(n, len));
                }
                // Past-the-end tail start is an empty tail, not an error
                let tail_start = n.saturating_mul(2).min(len);
                token.drain(n..tail_start);
            }
            PrimitiveOp::SwapHead(n) => {
                if len == 0 {
                    return Err(self.out_of_range(n, len));
                }
                token.swap(0, n % len);
            }
        }
        Ok(())
    }

    fn out_of_range(&self, argument: usize, len: usize) -> CipherError {
        CipherError::OutOfRange {
            op: self.kind().name(),
            argument,
            len,
        }
    }
}

impl fmt::Display for PrimitiveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveOp::Reverse => write!(f, "reverse"),
            PrimitiveOp::DropMiddle(n) => write!(f, "drop-middle({})", n),
            PrimitiveOp::SwapHead(n) => write!(f, "swap-head({})", n),
        }
    }
}
