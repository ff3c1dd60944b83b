pub mod proposal;
pub mod user;

pub use proposal::{
    CreateProposalRequest, FulfillProposalRequest, ProposalDetail, ProposalQuery, SwapItem,
    SwapOption, SwapProposal, SwapProposalStatus,
};
pub use user::{CreateUserRequest, GetPublicProfilesRequest, PublicProfile, User};
