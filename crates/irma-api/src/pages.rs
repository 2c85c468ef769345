//! Static HTML forms. Everything else the server returns is JSON.

pub const LOGIN: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Login</title></head>
<body>
<h1>Login</h1>
<form method="post">
  <label>Username <input name="username" required></label>
  <label>Password <input name="password" type="password" required></label>
  <button type="submit">Log in</button>
</form>
<p><a href="/register">Register</a></p>
</body></html>
"#;

pub const REGISTER: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Register</title></head>
<body>
<h1>Register</h1>
<form method="post" action="/register">
  <label>Username <input name="username" maxlength="10" required></label>
  <label>Password <input name="password" type="password" required></label>
  <label>Email <input name="email" type="email" required></label>
  <button type="submit">Create account</button>
</form>
</body></html>
"#;

pub const NEW_POST: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>New post</title></head>
<body>
<h1>New post</h1>
<form method="post" action="/board/new">
  <label>Title <input name="title" required></label>
  <label>Content <textarea name="content"></textarea></label>
  <button type="submit">Publish</button>
</form>
</body></html>
"#;

pub const NEW_LISTING: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>New listing</title></head>
<body>
<h1>New listing</h1>
<form method="post" action="/market/new">
  <label>Name <input name="name" required></label>
  <label>Price <input name="price" type="number" min="0" required></label>
  <label>Description <textarea name="description"></textarea></label>
  <button type="submit">List</button>
</form>
</body></html>
"#;

pub const EDIT_PROFILE: &str = r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Edit profile</title></head>
<body>
<h1>Edit profile</h1>
<form method="post" action="/profile/edit">
  <label>New username <input name="edit_username" maxlength="10"></label>
  <label>Email <input name="email" type="email" required></label>
  <label>Current password <input name="password" type="password" required></label>
  <button type="submit">Save</button>
</form>
</body></html>
"#;
