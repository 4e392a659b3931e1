use crate::domain_port::*;

fn invalid(procedure: &'static str, code: i64) -> StoreError {
    StoreError::InvalidCode { procedure, code }
}

pub(super) fn add_friendship(code: i64) -> Result<AddFriendshipCode, StoreError> {
    match code {
        0 => Ok(AddFriendshipCode::NowFriends),
        1 => Ok(AddFriendshipCode::AlreadyFriends),
        2 => Ok(AddFriendshipCode::RequesterLimitReached),
        3 => Ok(AddFriendshipCode::AccepterLimitReached),
        other => Err(invalid("qf_add_friend", other)),
    }
}

pub(super) fn add_block(code: i64) -> Result<AddBlockCode, StoreError> {
    match code {
        0 => Ok(AddBlockCode::NowBlocked),
        1 => Ok(AddBlockCode::AlsoUnfriended),
        2 => Ok(AddBlockCode::AlreadyBlocked),
        other => Err(invalid("qf_add_block", other)),
    }
}

pub(super) fn disposition(code: i64) -> Result<RequestDisposition, StoreError> {
    match code {
        0 => Ok(RequestDisposition::Notify),
        1 => Ok(RequestDisposition::Mute),
        2 => Ok(RequestDisposition::BlockedByRequester),
        3 => Ok(RequestDisposition::BlockedByReceiver),
        4 => Ok(RequestDisposition::AlreadyFriends),
        5 => Ok(RequestDisposition::LimitReached),
        other => Err(invalid("qf_friend_request_disposition", other)),
    }
}

/// `true` when the procedure removed a row and returned it.
pub(super) fn removed(procedure: &'static str, code: i64) -> Result<bool, StoreError> {
    match code {
        -1 => Ok(true),
        0 => Ok(false),
        other => Err(invalid(procedure, other)),
    }
}
