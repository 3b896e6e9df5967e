/// Stack-machine instruction set.
///
/// Every instruction documents its operand-stack effect; the compiler and
/// the interpreter both rely on that accounting being exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Push `consts[i]`. [ ] -> [ v ]
    Const(u16),
    /// Push the global named `names[i]`; fault if undeclared. [ ] -> [ v ]
    GetGlobal(u16),
    /// Pop and assign the global named `names[i]`. In a strict chunk the
    /// name must already be declared. [ v ] -> [ ]
    SetGlobal(u16),
    /// Pop and declare the global named `names[i]` unconditionally.
    /// [ v ] -> [ ]
    DeclGlobal(u16),
    /// Discard the top value. [ v ] -> [ ]
    Pop,
    /// Pop into the frame's completion-value slot. [ v ] -> [ ]
    StoreResult,

    // Binary operators: [ a b ] -> [ a op b ]
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Unary operators: [ a ] -> [ op a ]
    Neg,
    Not,

    /// Call with `n` arguments. [ f a1..an ] -> [ result ]
    Call(u8),

    /// Return the popped top of stack. [ v ] -> (frame exit)
    Return,
    /// Return `undefined`. (frame exit)
    ReturnUndefined,
    /// Return the frame's completion-value slot. (frame exit)
    ReturnResult,
}
