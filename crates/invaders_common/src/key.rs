/// Logical keys shared between frontends and machine cores.
///
/// Frontends translate their native keycodes into this set; anything a
/// core does not care about maps to `None` and is ignored.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Key {
    None,
    Num1,
    Num2,
    A,
    C,
    D,
    J,
    K,
    L,
    P,
    S,
    T,
    Space,
    Left,
    Right,
    Escape,
}
