//! # Reflect Module
//!
//! Auto-registration of handler objects. A handler object lists its
//! operations by name (usually through [`crate::routes`]); the [`Reflector`]
//! turns each name into an HTTP verb and a path under the object's prefix:
//!
//! | Operation      | Route                    |
//! |----------------|--------------------------|
//! | `Get`          | `GET    {prefix}`        |
//! | `GetUserInfo`  | `GET    {prefix}/user/info` |
//! | `GetUser_id`   | `GET    {prefix}/user/:id`  |
//! | `PostParam`    | `POST   {prefix}/:param`    |
//! | `PutParams`    | `PUT    {prefix}/:param?`   |
//! | `AllStatus`    | `ALL    {prefix}/status`    |
//!
//! Names that do not start with `Get`, `Post`, `Put`, `Delete`, `Patch`,
//! `Head` or `All` are not routes. Registration itself happens in
//! [`crate::App::handle`].

mod core;
mod namer;

pub use core::{AutoRoute, HandlerBase, HandlerObject, Operation, Operations, Reflector};
pub use namer::{classify, fix_uri, join_path, to_namer, AutoVerb, COMMON_INITIALISMS};
