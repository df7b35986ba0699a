// Event types and EV_KEY values (see [input-event-codes.h] and the [kernel docs]).
//
// [input-event-codes.h]: https://elixir.bootlin.com/linux/v5.19.17/source/include/uapi/linux/input-event-codes.h#L38)
// [kernel docs]: https://www.kernel.org/doc/html/latest/input/event-codes.html
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_MSC: u16 = 0x04;
pub const EV_REP: u16 = 0x14;

/// The `value` of an EV_KEY caused by a key being released.
pub const KEY_RELEASE: i32 = 0;
/// The `value` of an EV_KEY caused by a key press.
pub const KEY_PRESS: i32 = 1;
/// The `value` of an EV_KEY caused by a held key repeating.
pub const KEY_REPEAT: i32 = 2;
