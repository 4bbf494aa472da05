use super::ProtoError;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MsgType {
    Hello = 0x01,
    IdentityAssigned = 0x02,

    Invite = 0x10,
    IncomingInvite = 0x11,
    Accept = 0x12,
    Accepted = 0x13,

    Ping = 0x30,
    Pong = 0x31,
}

impl MsgType {
    /// # Errors
    ///
    /// [`ProtoError::UnknownType`] for any byte outside the table.
    pub fn from_u8(v: u8) -> Result<Self, ProtoError> {
        use MsgType::*;
        match v {
            0x01 => Ok(Hello),
            0x02 => Ok(IdentityAssigned),
            0x10 => Ok(Invite),
            0x11 => Ok(IncomingInvite),
            0x12 => Ok(Accept),
            0x13 => Ok(Accepted),
            0x30 => Ok(Ping),
            0x31 => Ok(Pong),
            other => Err(ProtoError::UnknownType(other)),
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}
