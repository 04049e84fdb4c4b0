use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: RefObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefObject {
    pub sha: String,
}

/// Node ids needed to link a branch to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingTarget {
    pub repository_id: String,
    pub issue_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedBranch {
    pub id: String,
    pub ref_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub id: String,
    pub title: String,
    pub url: String,
}

// GraphQL response shapes

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryData {
    pub repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryNode {
    pub id: String,
    pub issue: Option<IssueNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueNode {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLinkedBranchData {
    pub create_linked_branch: Option<CreateLinkedBranchPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLinkedBranchPayload {
    pub linked_branch: Option<LinkedBranchNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LinkedBranchNode {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: Option<RefNameNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefNameNode {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectOwnerData {
    #[serde(alias = "user")]
    pub organization: Option<ProjectOwnerNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectOwnerNode {
    #[serde(rename = "projectV2")]
    pub project: Option<ProjectDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddProjectItemData {
    #[serde(rename = "addProjectV2ItemById")]
    pub add_item: Option<AddProjectItemPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddProjectItemPayload {
    pub item: Option<ProjectItemNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectItemNode {
    pub id: String,
}
