//! Graph payloads used by the site, drive, and upload operations.
//!
//! Only the fields the service reads are modeled; everything else Graph returns is ignored.

// self
use crate::_prelude::*;

/// Site resolved from a server-relative path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDetails {
	/// Composite site id (`host,siteCollectionId,webId`).
	pub id: String,
	/// Title shown in SharePoint.
	#[serde(default)]
	pub display_name: Option<String>,
	/// URL segment of the site.
	#[serde(default)]
	pub name: Option<String>,
	/// Creation instant.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub created_date_time: Option<OffsetDateTime>,
	/// Last modification instant.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_modified_date_time: Option<OffsetDateTime>,
	/// Browser URL.
	#[serde(default)]
	pub web_url: Option<String>,
}

/// Collection wrapper returned by `sites/{id}/drives`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveDetails {
	/// OData context URL.
	#[serde(rename = "@odata.context", default)]
	pub odata_context: Option<String>,
	/// Document libraries of the site.
	#[serde(default)]
	pub value: Vec<Drive>,
}

/// Document library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
	/// Drive id used by upload calls.
	pub id: String,
	/// Library display name, e.g. `Documents`.
	pub name: String,
	#[allow(missing_docs)]
	#[serde(default)]
	pub description: Option<String>,
	#[allow(missing_docs)]
	#[serde(default)]
	pub web_url: Option<String>,
}

/// Drive item created by an upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
	/// OData context URL.
	#[serde(rename = "@odata.context", default)]
	pub odata_context: Option<String>,
	/// Short-lived pre-authenticated download URL.
	#[serde(rename = "@microsoft.graph.downloadUrl", default)]
	pub download_url: Option<String>,
	#[allow(missing_docs)]
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub created_date_time: Option<OffsetDateTime>,
	/// Entity tag of the item.
	#[serde(default)]
	pub e_tag: Option<String>,
	/// Item id.
	pub id: String,
	#[allow(missing_docs)]
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_modified_date_time: Option<OffsetDateTime>,
	/// Final file name; differs from the requested one when Graph renamed on conflict.
	pub name: String,
	#[allow(missing_docs)]
	#[serde(default)]
	pub web_url: Option<String>,
	/// Content tag of the item.
	#[serde(default)]
	pub c_tag: Option<String>,
	/// Size in bytes.
	#[serde(default)]
	pub size: u64,
	#[allow(missing_docs)]
	#[serde(default)]
	pub created_by: Option<IdentitySet>,
	#[allow(missing_docs)]
	#[serde(default)]
	pub last_modified_by: Option<IdentitySet>,
	#[allow(missing_docs)]
	#[serde(default)]
	pub file_system_info: Option<FileSystemInfo>,
}

/// Who performed an action on an item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySet {
	#[allow(missing_docs)]
	#[serde(default)]
	pub application: Option<Application>,
	#[allow(missing_docs)]
	#[serde(default)]
	pub user: Option<User>,
}

/// Application identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
	#[allow(missing_docs)]
	#[serde(default)]
	pub id: Option<String>,
	#[allow(missing_docs)]
	#[serde(default)]
	pub display_name: Option<String>,
}

/// User identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	#[allow(missing_docs)]
	#[serde(default)]
	pub display_name: Option<String>,
}

/// Client-side timestamps of a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemInfo {
	#[allow(missing_docs)]
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub created_date_time: Option<OffsetDateTime>,
	#[allow(missing_docs)]
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_modified_date_time: Option<OffsetDateTime>,
}

/// File to upload plus the optional site/drive hints sent by the upload form.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UploadFile {
	/// Target file name inside the drive root.
	pub name: String,
	/// Raw file content.
	pub content: Vec<u8>,
	/// Site the caller believes the drive belongs to.
	pub site_name: Option<String>,
	/// Display name of the drive.
	pub drive_name: Option<String>,
}
impl UploadFile {
	/// Creates an upload without site/drive hints.
	pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
		Self { name: name.into(), content: content.into(), site_name: None, drive_name: None }
	}
}
impl Debug for UploadFile {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UploadFile")
			.field("name", &self.name)
			.field("content_len", &self.content.len())
			.field("site_name", &self.site_name)
			.field("drive_name", &self.drive_name)
			.finish()
	}
}
