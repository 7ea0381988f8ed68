pub mod cat;
pub mod cp;
pub mod ls;
pub mod md5;
pub mod mkdir;
pub mod movedir;
pub mod mv;
pub mod purge;
pub mod put;
pub mod rm;
pub mod rmdir;
pub mod stat;
mod transfer;

crate::command_enum! {
    (Ls, ls::Ls),
    (Mkdir, mkdir::Mkdir),
    (Rmdir, rmdir::Rmdir),
    (Purge, purge::Purge),
    (Rm, rm::Rm),
    (Stat, stat::Stat),
    (Md5, md5::Md5),
    (Cat, cat::Cat),
    (Put, put::Put),
    (Mv, mv::Mv),
    (Cp, cp::Cp),
    (Movedir, movedir::Movedir),
}
